//! Server configuration settings

use serde::{Deserialize, Serialize};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins (empty = all)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// CORS preflight cache time in seconds
    #[serde(default = "default_cors_max_age")]
    pub cors_max_age_secs: u64,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// How long shutdown waits for in-flight generations before releasing
    /// the model anyway
    #[serde(default = "default_drain_timeout")]
    pub shutdown_drain_secs: u64,
}

fn default_port() -> u16 {
    3001
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_cors_max_age() -> u64 {
    86_400 // 24 hours
}

fn default_max_body_size() -> usize {
    64 * 1024
}

fn default_drain_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: Vec::new(),
            cors_max_age_secs: default_cors_max_age(),
            max_body_size: default_max_body_size(),
            shutdown_drain_secs: default_drain_timeout(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
