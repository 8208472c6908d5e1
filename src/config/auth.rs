//! Request authentication settings

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthGate, SharedSecret};

/// Deployment environment.
///
/// Only `development` skips HMAC verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(anyhow!(
                "unknown environment '{}', expected 'production' or 'development'",
                other
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// Shared signing secret. Usually supplied through `CLIENT_SECRET`
    /// rather than a config file.
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("environment", &self.environment)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl AuthConfig {
    /// Whether requests must carry a valid signature.
    pub fn enforced(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Build the gate, or `None` when verification is bypassed.
    pub fn gate(&self) -> Option<AuthGate> {
        if !self.enforced() {
            return None;
        }
        let secret = self.client_secret.clone().and_then(SharedSecret::new);
        Some(AuthGate::new(secret))
    }
}
