//! Core inference engine
//!
//! This module owns the model resource and the sessions derived from it:
//! - `ModelEngine` / `ChatSession`: the capability a loaded model offers
//! - `ModelLifecycle`: load / ready / dispose state of the single model
//! - `SessionGuard`: a per-request session released on every exit path
//! - `CandleEngine`: GGUF models run with candle

mod executor;
mod lifecycle;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use executor::{CandleEngine, CandleSession, QuantizedWeights};
pub use lifecycle::{LifecycleState, ModelLifecycle};
pub use session::{CancelOnDrop, CancelToken, SessionGuard};

use anyhow::Result;

use crate::config::GenerationConfig;

/// Per-session settings fixed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// Token budget shared by the prompt and the answer
    pub context_size: usize,
    /// Instruction framing the assistant's role
    pub system_prompt: String,
}

/// A loaded model.
///
/// Engines are not assumed to be reentrant; callers bound the number of live
/// sessions and treat `create_session` as the serialization point. Both
/// methods may block and are called from blocking threads.
pub trait ModelEngine: Send + Sync {
    /// Reserve an execution context and open a chat session on it.
    fn create_session(&self, params: &SessionParams) -> Result<Box<dyn ChatSession>>;

    /// Free the model's resources. Called once, at shutdown, after
    /// in-flight sessions have drained.
    fn release(&self);
}

/// A chat session bound to one execution context.
pub trait ChatSession: Send {
    /// Run one user turn and return the assistant's answer.
    fn prompt(
        &mut self,
        text: &str,
        config: &GenerationConfig,
        cancel: &CancelToken,
    ) -> Result<String>;

    /// Release the session and its context.
    fn dispose(&mut self);
}
