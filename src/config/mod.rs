//! Configuration system for lexr
//!
//! Settings come from an optional YAML/JSON file, then environment
//! variables, then CLI flags (applied by the `serve` command).

mod auth;
mod generation;
mod inference;
mod server;

pub use auth::{AuthConfig, Environment};
pub use generation::GenerationConfig;
pub use inference::{DeviceConfig, InferenceConfig, DEFAULT_SYSTEM_PROMPT};
pub use server::ServerConfig;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Port variable, as set by most hosting platforms
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
/// Shared HMAC secret
pub const ENV_CLIENT_SECRET: &str = "CLIENT_SECRET";
/// `production` or `development`
pub const ENV_ENVIRONMENT: &str = "LEXR_ENV";
/// Catalog id or model path
pub const ENV_MODEL: &str = "LEXR_MODEL";
pub const ENV_MODEL_DIR: &str = "LEXR_MODEL_DIR";

/// Lexr configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexrConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Request authentication settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Model and session settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Sampling policy
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl LexrConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from an optional file (format picked by extension) and overlay
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => match path.extension().and_then(|e| e.to_str()) {
                Some("json") => Self::from_json(path),
                Some("yaml") | Some("yml") => Self::from_yaml(path),
                other => Err(anyhow!("unsupported config format: {:?}", other)),
            }
            .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .parse()
                .with_context(|| format!("invalid {}='{}'", ENV_PORT, port))?;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
            self.auth.client_secret = Some(secret);
        }
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            self.auth.environment = environment.parse()?;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.inference.model = model;
        }
        if let Some(dir) = lookup(ENV_MODEL_DIR) {
            self.inference.model_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.inference.context_size == 0 {
            return Err(anyhow!("inference.context_size must be positive"));
        }
        if self.inference.max_concurrent_sessions == 0 {
            return Err(anyhow!("inference.max_concurrent_sessions must be positive"));
        }
        if self.generation.max_tokens == 0 {
            return Err(anyhow!("generation.max_tokens must be positive"));
        }
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(anyhow!("generation.top_p must be within [0, 1]"));
        }
        Ok(())
    }
}
