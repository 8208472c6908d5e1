//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{AuthError, InferenceError};

/// Error returned to HTTP clients as `{"message", "code"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_argument",
            message: message.into(),
        }
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code: "payload_too_large",
            message: format!("request body exceeds {} bytes", limit),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        let status = match err {
            InferenceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            InferenceError::ModelNotReady | InferenceError::GenerationFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "message": self.message,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_status_codes() {
        assert_eq!(
            ApiError::from(AuthError::InvalidSignature).status,
            StatusCode::UNAUTHORIZED
        );
        let misconfigured = ApiError::from(AuthError::ServerMisconfigured);
        assert_eq!(misconfigured.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(misconfigured.message, "Server configuration error");
    }

    #[test]
    fn test_inference_status_codes() {
        let invalid = ApiError::from(InferenceError::InvalidArgument("no word provided".into()));
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.message, "no word provided");

        let not_ready = ApiError::from(InferenceError::ModelNotReady);
        assert_eq!(not_ready.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(not_ready.message, "no model loaded");
    }
}
