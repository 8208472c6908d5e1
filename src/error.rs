//! Error taxonomy for the request path
//!
//! Auth failures are terminal for the request and map to 401, except
//! [`AuthError::ServerMisconfigured`] which is a deployment defect (500).
//! Inference failures are terminal per request but never fatal to the
//! process.

use thiserror::Error;

/// Reasons the auth gate rejects a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing HMAC headers")]
    MissingCredentials,

    #[error("Invalid timestamp")]
    StaleOrFutureTimestamp,

    #[error("Invalid HMAC signature")]
    InvalidSignature,

    #[error("Server configuration error")]
    ServerMisconfigured,
}

impl AuthError {
    /// Stable machine-readable code used in response bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::StaleOrFutureTimestamp => "stale_or_future_timestamp",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ServerMisconfigured => "server_misconfigured",
        }
    }

    /// Whether the failure is the client's fault (as opposed to ours).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::ServerMisconfigured)
    }
}

/// Failures of the inference gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("no model loaded")]
    ModelNotReady,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

impl InferenceError {
    pub fn code(&self) -> &'static str {
        match self {
            InferenceError::ModelNotReady => "model_not_ready",
            InferenceError::InvalidArgument(_) => "invalid_argument",
            InferenceError::GenerationFailed(_) => "generation_failed",
        }
    }

    pub(crate) fn generation(err: impl std::fmt::Display) -> Self {
        InferenceError::GenerationFailed(err.to_string())
    }
}

pub type InferenceResult<T> = std::result::Result<T, InferenceError>;
