//! Route definitions

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers::{define, health, preflight, AppState};
use super::middleware::verify_signature;

/// Create the API router
///
/// `/dictionary` sits behind signature verification; `/health` does not.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let dictionary = Router::new()
        .route("/dictionary", post(define).options(preflight))
        .route_layer(middleware::from_fn_with_state(state, verify_signature));

    Router::new()
        // Health check
        .route("/health", get(health))
        .merge(dictionary)
}
