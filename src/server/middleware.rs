//! Signature verification middleware

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::error::ApiError;
use super::AppState;
use crate::auth::{
    canonical_query, SignedRequest, CLIENT_ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};

/// Reject requests whose HMAC credentials do not verify.
///
/// The body is buffered to compute its canonical form, then handed on
/// unchanged. Preflight requests pass through untouched.
pub async fn verify_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let gate = match state.gate.as_ref() {
        Some(gate) if request.method() != Method::OPTIONS => gate,
        _ => return next.run(request).await,
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(_) => return ApiError::payload_too_large(state.max_body_size).into_response(),
    };

    let body_json = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => value,
            Err(e) => {
                return ApiError::bad_request(format!("malformed JSON body: {}", e)).into_response()
            }
        }
    };

    let query = match canonical_query(parts.uri.query()) {
        Ok(query) => query,
        Err(e) => {
            return ApiError::bad_request(format!("malformed query string: {}", e)).into_response()
        }
    };

    let signed = SignedRequest {
        client_id: header(&parts.headers, CLIENT_ID_HEADER),
        signature: header(&parts.headers, SIGNATURE_HEADER),
        timestamp: header(&parts.headers, TIMESTAMP_HEADER),
        query,
        body: body_json,
    };

    if let Err(err) = gate.verify(&signed) {
        if err.is_client_error() {
            tracing::warn!(
                client_id = signed.client_id.as_deref().unwrap_or("-"),
                reason = err.code(),
                "rejected unauthenticated request"
            );
        }
        return ApiError::from(err).into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}
