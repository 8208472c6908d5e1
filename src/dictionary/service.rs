//! Dictionary service: one scoped session per lookup

use std::sync::Arc;
use std::time::Duration;

use crate::config::{GenerationConfig, LexrConfig};
use crate::engine::{ModelLifecycle, SessionParams};
use crate::error::{InferenceError, InferenceResult};

use super::{DictionaryQuery, DictionaryRequest};

/// Turns dictionary requests into generated definitions.
pub struct DictionaryService {
    lifecycle: Arc<ModelLifecycle>,
    session: SessionParams,
    generation: GenerationConfig,
    timeout: Duration,
}

impl DictionaryService {
    pub fn new(
        lifecycle: Arc<ModelLifecycle>,
        session: SessionParams,
        generation: GenerationConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            lifecycle,
            session,
            generation,
            timeout,
        }
    }

    pub fn from_config(lifecycle: Arc<ModelLifecycle>, config: &LexrConfig) -> Self {
        Self::new(
            lifecycle,
            SessionParams {
                context_size: config.inference.context_size,
                system_prompt: config.inference.system_prompt.clone(),
            },
            config.generation.clone(),
            Duration::from_secs(config.inference.generation_timeout_secs),
        )
    }

    pub fn lifecycle(&self) -> &Arc<ModelLifecycle> {
        &self.lifecycle
    }

    /// Validate a request and generate its definition.
    pub async fn define(&self, request: DictionaryRequest) -> InferenceResult<String> {
        // Fields are checked before readiness, so a malformed request is a 400
        // even while the model loads, where a readiness-first order would say 500.
        let query = DictionaryQuery::try_from(request)?;
        tracing::debug!(
            word = %query.word,
            lang = %query.source_language,
            with_phrase = query.phrase.is_some(),
            "dictionary lookup"
        );
        self.generate(query.prompt()).await
    }

    /// Run `prompt` in a fresh session.
    ///
    /// The session is moved into the blocking generation task, so it is
    /// released when that task ends however it ends. On timeout the decoding
    /// loop is cancelled and the error is returned once the session is gone.
    /// Dropping the returned future cancels generation too.
    pub async fn generate(&self, prompt: String) -> InferenceResult<String> {
        let mut session = self.lifecycle.acquire_session(self.session.clone()).await?;

        let cancel = session.cancel_token();
        let _cancel_on_drop = cancel.drop_guard();
        let mut task = {
            let generation = self.generation.clone();
            tokio::task::spawn_blocking(move || session.prompt(&prompt, &generation))
        };

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(text))) => Ok(text),
            Ok(Ok(Err(err))) => {
                tracing::warn!(error = %err, "generation failed");
                Err(InferenceError::generation(err))
            }
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "generation task panicked");
                Err(InferenceError::generation("generation task aborted"))
            }
            Err(_) => {
                cancel.cancel();
                // the loop stops at the next token and drops the session
                let _ = task.await;
                tracing::warn!("generation timed out after {:?}", self.timeout);
                Err(InferenceError::GenerationFailed(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f64()
                )))
            }
        }
    }
}
