//! Inference configuration settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::catalog::{self, CatalogEntry};
use crate::model::ChatTemplate;

/// System instruction framing the assistant's role.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a highschool teacher that helps students to understand the meaning of words.";

/// Device configuration for inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceConfig {
    /// Simple device string (e.g., "cuda:0", "metal", "cpu")
    Simple(String),
    /// Detailed device configuration
    Detailed {
        /// Device type: "cuda", "metal", "cpu"
        device_type: String,
        /// Device ID (for multi-GPU)
        #[serde(default)]
        device_id: usize,
    },
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig::Simple("cpu".to_string())
    }
}

impl DeviceConfig {
    /// Get device type ("cuda", "metal" or "cpu")
    pub fn device_type(&self) -> &str {
        match self {
            DeviceConfig::Simple(s) => {
                if s.starts_with("cuda") {
                    "cuda"
                } else if s.starts_with("metal") {
                    "metal"
                } else {
                    "cpu"
                }
            }
            DeviceConfig::Detailed { device_type, .. } => device_type,
        }
    }

    /// Get device ID (for multi-GPU)
    pub fn device_id(&self) -> usize {
        match self {
            DeviceConfig::Simple(s) => s
                .split_once(':')
                .and_then(|(_, id)| id.parse().ok())
                .unwrap_or(0),
            DeviceConfig::Detailed { device_id, .. } => *device_id,
        }
    }
}

/// Inference-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Catalog id (e.g. "qwen1_5b") or a path to a GGUF file / directory
    #[serde(default = "default_model")]
    pub model: String,

    /// Directory searched for catalog models
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Explicit tokenizer.json (otherwise found next to the weights)
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,

    /// Device configuration
    #[serde(default)]
    pub device: DeviceConfig,

    /// Token budget of each inference session (prompt + answer)
    #[serde(default = "default_context_size")]
    pub context_size: usize,

    /// Live sessions allowed at once; 1 serializes generation
    #[serde(default = "default_max_sessions")]
    pub max_concurrent_sessions: usize,

    /// Server-side bound on a single generation, in seconds
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,

    /// System instruction given to every session
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Prompt format override (otherwise from the catalog or GGUF metadata)
    #[serde(default)]
    pub template: Option<ChatTemplate>,
}

fn default_model() -> String {
    catalog::DEFAULT_MODEL.to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_context_size() -> usize {
    2048
}

fn default_max_sessions() -> usize {
    1
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            model_dir: default_model_dir(),
            tokenizer_path: None,
            device: DeviceConfig::default(),
            context_size: default_context_size(),
            max_concurrent_sessions: default_max_sessions(),
            generation_timeout_secs: default_generation_timeout(),
            system_prompt: default_system_prompt(),
            template: None,
        }
    }
}

impl InferenceConfig {
    /// Catalog entry for the configured model, if it names one.
    pub fn catalog_entry(&self) -> Option<&'static CatalogEntry> {
        catalog::lookup(&self.model)
    }

    /// Resolve the configured model to a path on disk.
    ///
    /// Catalog ids resolve to their GGUF file inside `model_dir`; anything
    /// else is taken as a path.
    pub fn model_path(&self) -> PathBuf {
        match self.catalog_entry() {
            Some(entry) => self.model_dir.join(entry.file),
            None => PathBuf::from(&self.model),
        }
    }
}
