//! List models command

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::ENV_MODEL_DIR;
use crate::model::{catalog, CatalogEntry, CATALOG};

/// List catalog models and any other GGUF files in the model directory
pub async fn models(verbose: bool) -> Result<()> {
    let model_dir = std::env::var(ENV_MODEL_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./models"));

    println!("Catalog (model directory: {}):\n", model_dir.display());
    for (entry, downloaded) in catalog_status(&model_dir) {
        let marker = if downloaded { "downloaded" } else { "-" };
        println!("  {:<10} {:<11} {}", entry.id, marker, entry.file);
        if verbose {
            println!("    Repository: {}", entry.repo);
            println!("    Tokenizer: {}", entry.tokenizer_repo);
            println!("    Template: {:?}", entry.template);
            if downloaded {
                print_size(&model_dir.join(entry.file));
            }
        }
    }

    let extra = other_models(&model_dir);
    if !extra.is_empty() {
        println!("\nOther GGUF files:\n");
        for path in extra {
            println!("  {}", path.display());
            if verbose {
                print_size(&path);
            }
        }
    }

    println!("\nUse 'lexr pull <id>' to download a catalog model.");
    Ok(())
}

/// Catalog entries paired with whether their GGUF file is present.
fn catalog_status(model_dir: &Path) -> Vec<(&'static CatalogEntry, bool)> {
    CATALOG
        .iter()
        .map(|entry| (entry, model_dir.join(entry.file).is_file()))
        .collect()
}

/// GGUF files in `model_dir` that are not catalog models.
fn other_models(model_dir: &Path) -> Vec<PathBuf> {
    let pattern = model_dir.join("*.gguf");
    let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };
    paths
        .filter_map(|r| r.ok())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |name| catalog::lookup_by_file(name).is_none())
        })
        .collect()
}

fn print_size(path: &Path) {
    if let Ok(metadata) = std::fs::metadata(path) {
        let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);
        if size_mb > 1024.0 {
            println!("    Size: {:.2} GB", size_mb / 1024.0);
        } else {
            println!("    Size: {:.2} MB", size_mb);
        }
    }
}
