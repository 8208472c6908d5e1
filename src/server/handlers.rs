//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::auth::AuthGate;
use crate::dictionary::{DictionaryRequest, DictionaryService};

/// Shared application state
pub struct AppState {
    pub dictionary: DictionaryService,
    /// `None` when signature checks are bypassed (development)
    pub gate: Option<AuthGate>,
    /// Largest body the signature middleware buffers
    pub max_body_size: usize,
}

impl AppState {
    pub fn new(dictionary: DictionaryService, gate: Option<AuthGate>, max_body_size: usize) -> Self {
        Self {
            dictionary,
            gate,
            max_body_size,
        }
    }
}

/// Successful lookup
#[derive(Debug, Serialize, Deserialize)]
pub struct DefinitionResponse {
    pub result: String,
}

/// Liveness and model state
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub in_flight: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let lifecycle = state.dictionary.lifecycle();
    Json(HealthResponse {
        status: "ok".to_string(),
        model: lifecycle.state().to_string(),
        in_flight: lifecycle.in_flight(),
    })
}

/// Dictionary lookup endpoint
pub async fn define(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DictionaryRequest>, JsonRejection>,
) -> Result<Json<DefinitionResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let result = state.dictionary.define(request).await?;
    Ok(Json(DefinitionResponse { result }))
}

/// Bare `OPTIONS` (CORS preflights are answered by the CORS layer)
pub async fn preflight() -> impl IntoResponse {
    StatusCode::OK
}
