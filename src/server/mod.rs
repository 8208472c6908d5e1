//! HTTP server for dictionary lookups
//!
//! The listener comes up immediately; the model loads in the background and
//! requests fail with `no model loaded` until it is ready.

mod error;
mod handlers;
mod middleware;
mod routes;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{CLIENT_ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::config::{LexrConfig, ServerConfig};
use crate::dictionary::DictionaryService;
use crate::engine::{LifecycleState, ModelLifecycle};
use crate::loader;

pub use error::ApiError;
pub use handlers::{AppState, DefinitionResponse, HealthResponse};
pub use routes::api_routes;

type FatalSlot = Arc<Mutex<Option<anyhow::Error>>>;

/// Build the application router with CORS, security headers, tracing and
/// body limits.
pub fn router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .merge(api_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        // the endpoint is meant to be called from other origins
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("cross-origin"),
        ))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins = if config.cors_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(SIGNATURE_HEADER),
            HeaderName::from_static(TIMESTAMP_HEADER),
            HeaderName::from_static(CLIENT_ID_HEADER),
        ])
        .expose_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.cors_max_age_secs))
}

/// Start the HTTP server and load the model in the background.
///
/// Returns once a shutdown signal arrived and the model was released, or
/// with an error if the model failed to load.
pub async fn start(config: LexrConfig) -> Result<()> {
    let gate = config.auth.gate();
    match &gate {
        None => tracing::warn!(
            "Running in {} mode: HMAC verification is DISABLED",
            config.auth.environment
        ),
        Some(gate) if !gate.is_configured() => tracing::error!(
            "CLIENT_SECRET is not set; signed requests will be rejected as misconfigured"
        ),
        Some(_) => tracing::info!("HMAC verification enabled"),
    }

    let lifecycle = Arc::new(ModelLifecycle::new(
        config.inference.max_concurrent_sessions,
    ));
    let dictionary = DictionaryService::from_config(lifecycle.clone(), &config);
    let state = Arc::new(AppState::new(dictionary, gate, config.server.max_body_size));
    let app = router(state, &config.server);

    let addr = config.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  POST /dictionary - Word definition");

    let (load_failed_tx, load_failed_rx) = oneshot::channel();
    let load_task = {
        let lifecycle = lifecycle.clone();
        let inference = config.inference.clone();
        tokio::spawn(async move {
            let result = lifecycle.load(loader::load_engine(inference)).await;
            if let Err(err) = result {
                if lifecycle.state() == LifecycleState::Disposed {
                    tracing::info!("Model load abandoned: {:#}", err);
                } else {
                    tracing::error!("Model load failed: {:#}", err);
                    let _ = load_failed_tx.send(err);
                }
            }
        })
    };

    let fatal: FatalSlot = Arc::default();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(
            lifecycle.clone(),
            load_failed_rx,
            fatal.clone(),
        ))
        .await?;

    lifecycle
        .shutdown(Duration::from_secs(config.server.shutdown_drain_secs))
        .await;
    load_task.abort();

    let fatal = fatal.lock().unwrap_or_else(PoisonError::into_inner).take();
    match fatal {
        Some(err) => Err(err.context("model failed to load")),
        None => {
            tracing::info!("Server stopped");
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C, SIGTERM or a failed model load, after which the
/// lifecycle stops handing out sessions.
async fn shutdown_signal(
    lifecycle: Arc<ModelLifecycle>,
    load_failed: oneshot::Receiver<anyhow::Error>,
    fatal: FatalSlot,
) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    // a dropped sender means the load succeeded
    let load_failed = async {
        match load_failed.await {
            Ok(err) => err,
            Err(_) => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
        err = load_failed => {
            tracing::error!("Shutting down: the model could not be loaded");
            *fatal.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
        },
    }

    lifecycle.begin_shutdown();
}
