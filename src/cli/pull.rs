//! Pull model from HuggingFace Hub

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use hf_hub::api::sync::Api;

use crate::config::ENV_MODEL_DIR;
use crate::model::{catalog, tokenizer_file_for};

/// What to fetch for one model
#[derive(Debug, Clone, PartialEq, Eq)]
struct PullPlan {
    repo: String,
    file: String,
    tokenizer_repo: String,
}

/// Pull a GGUF model and its tokenizer from HuggingFace Hub
pub async fn pull(
    model: String,
    file: Option<String>,
    tokenizer_repo: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let plan = plan(&model, file, tokenizer_repo)?;
    let output_dir = output.unwrap_or_else(|| {
        std::env::var(ENV_MODEL_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./models"))
    });

    // Create output directory if it doesn't exist
    std::fs::create_dir_all(&output_dir)?;

    let api = Api::new()?;

    println!("Downloading from: {}", plan.repo);
    println!("Downloading file: {}", plan.file);
    let weights = api
        .model(plan.repo.clone())
        .get(&plan.file)
        .with_context(|| format!("failed to download {} from {}", plan.file, plan.repo))?;
    let dest = copy_into(&weights, &output_dir, &plan.file)?;
    println!("Downloaded to: {}", dest.display());

    println!("Downloading tokenizer from: {}", plan.tokenizer_repo);
    let tokenizer = api
        .model(plan.tokenizer_repo.clone())
        .get("tokenizer.json")
        .with_context(|| format!("failed to download tokenizer.json from {}", plan.tokenizer_repo))?;
    let dest = copy_into(&tokenizer, &output_dir, &tokenizer_file_for(&plan.file))?;
    println!("Downloaded to: {}", dest.display());

    Ok(())
}

fn plan(model: &str, file: Option<String>, tokenizer_repo: Option<String>) -> Result<PullPlan> {
    if let Some(entry) = catalog::lookup(model) {
        return Ok(PullPlan {
            repo: entry.repo.to_string(),
            file: file.unwrap_or_else(|| entry.file.to_string()),
            tokenizer_repo: tokenizer_repo.unwrap_or_else(|| entry.tokenizer_repo.to_string()),
        });
    }

    if !model.contains('/') {
        return Err(anyhow!(
            "'{}' is neither a catalog model nor a repository id (see `lexr models`)",
            model
        ));
    }
    let file = file.ok_or_else(|| anyhow!("--file is required when pulling from a repository"))?;
    Ok(PullPlan {
        repo: model.to_string(),
        file,
        tokenizer_repo: tokenizer_repo.unwrap_or_else(|| model.to_string()),
    })
}

fn copy_into(cached: &Path, dir: &Path, name: &str) -> Result<PathBuf> {
    let dest = dir.join(name);
    std::fs::copy(cached, &dest)
        .with_context(|| format!("failed to copy {} to {}", cached.display(), dest.display()))?;
    Ok(dest)
}
