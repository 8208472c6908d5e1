//! HTTP server command

use std::path::PathBuf;

use anyhow::Result;

use crate::config::{Environment, LexrConfig};
use crate::server;

/// Start the dictionary server
pub async fn serve(
    config: Option<PathBuf>,
    model: Option<String>,
    port: Option<u16>,
    host: Option<String>,
    dev: bool,
) -> Result<()> {
    let mut config = LexrConfig::load(config.as_deref())?;
    apply_overrides(&mut config, model, port, host, dev);
    config.validate()?;

    tracing::info!(
        "Starting lexr ({} mode, model {})",
        config.auth.environment,
        config.inference.model
    );
    server::start(config).await
}

/// CLI flags take precedence over file and environment settings.
fn apply_overrides(
    config: &mut LexrConfig,
    model: Option<String>,
    port: Option<u16>,
    host: Option<String>,
    dev: bool,
) {
    if let Some(model) = model {
        config.inference.model = model;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if dev {
        config.auth.environment = Environment::Development;
    }
}
