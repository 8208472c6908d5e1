//! Lexr - signed dictionary definitions from a local language model
//!
//! Lexr serves a single HTTP endpoint that turns a word, optionally with
//! the phrase it appears in, into a definition generated by a GGUF model
//! running locally with candle.
//!
//! # Architecture
//!
//! - **auth**: HMAC-SHA256 request signatures with a freshness window
//! - **engine**: model lifecycle and per-request scoped sessions
//! - **dictionary**: request validation and prompt construction
//! - **server**: axum router, CORS, graceful shutdown
//!
//! # Example
//!
//! ```bash
//! # Download the default model
//! lexr pull qwen1_5b
//!
//! # Start server
//! CLIENT_SECRET=... lexr serve --port 3001
//!
//! # Headers for a signed request
//! lexr sign --client-id web --body '{"word":"chat","lang":"french"}'
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod server;
pub mod tokenizer;

// Re-export key types
pub use auth::{AuthGate, SharedSecret, SignedRequest};
pub use config::{GenerationConfig, LexrConfig, ServerConfig};
pub use dictionary::{DictionaryQuery, DictionaryRequest, DictionaryService};
pub use engine::{LifecycleState, ModelLifecycle};
pub use error::{AuthError, InferenceError};
pub use loader::{load_model, ModelSource};
