//! Model source detection

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::model::tokenizer_file_for;

/// Detected model source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    /// Path to the GGUF weights
    pub weights_path: PathBuf,
    /// Path to the matching `tokenizer.json`
    pub tokenizer_path: PathBuf,
}

/// Detect model files from a path
///
/// The path can be:
/// - A direct path to a .gguf file
/// - A directory containing one
///
/// The tokenizer is `tokenizer` when given, otherwise
/// `<stem>.tokenizer.json` or `tokenizer.json` next to the weights.
pub fn detect_model_source<P: AsRef<Path>>(
    path: P,
    tokenizer: Option<&Path>,
) -> Result<ModelSource> {
    let path = path.as_ref();

    let weights_path = if path.is_file() {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != "gguf" {
            return Err(anyhow!("Unsupported model file format: .{}", ext));
        }
        path.to_path_buf()
    } else if path.is_dir() {
        find_gguf_in_dir(path)
            .ok_or_else(|| anyhow!("No GGUF model found in directory: {}", path.display()))?
    } else {
        return Err(anyhow!("Model path does not exist: {}", path.display()));
    };

    let tokenizer_path = match tokenizer {
        Some(explicit) if explicit.is_file() => explicit.to_path_buf(),
        Some(explicit) => {
            return Err(anyhow!("Tokenizer not found: {}", explicit.display()));
        }
        None => find_tokenizer_for(&weights_path).ok_or_else(|| {
            anyhow!(
                "No tokenizer.json found next to {} (try `lexr pull`)",
                weights_path.display()
            )
        })?,
    };

    Ok(ModelSource {
        weights_path,
        tokenizer_path,
    })
}

/// Find the tokenizer stored alongside a GGUF file
fn find_tokenizer_for(weights: &Path) -> Option<PathBuf> {
    let dir = weights.parent()?;
    let file_name = weights.file_name()?.to_str()?;
    [tokenizer_file_for(file_name), "tokenizer.json".to_string()]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Find a GGUF file in a directory
fn find_gguf_in_dir(dir: &Path) -> Option<PathBuf> {
    let pattern = dir.join("*.gguf");
    glob::glob(pattern.to_str()?)
        .ok()?
        .filter_map(|r| r.ok())
        .next()
}
