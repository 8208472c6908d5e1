//! Scoped inference sessions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::OwnedSemaphorePermit;

use super::ChatSession;
use crate::config::GenerationConfig;

/// Cooperative cancellation flag checked by decoding loops between tokens.
///
/// A token made with [`CancelToken::child`] is also cancelled when its
/// parent is.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh token that also observes `self`.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::default(),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.load(Ordering::Acquire))
    }

    /// Cancel this token when the returned guard is dropped.
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

/// Cancels its token on drop, e.g. when a request future is abandoned.
#[derive(Debug)]
pub struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// A chat session owned by exactly one request.
///
/// Dropping the guard disposes the session, then returns its concurrency
/// permit. This happens on success, on error, on timeout once the decoding
/// loop notices cancellation, and during unwinding.
pub struct SessionGuard {
    session: Option<Box<dyn ChatSession>>,
    cancel: CancelToken,
    // dropped after `session` is disposed
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    pub(crate) fn new(
        session: Box<dyn ChatSession>,
        permit: OwnedSemaphorePermit,
        cancel: CancelToken,
    ) -> Self {
        Self {
            session: Some(session),
            cancel,
            _permit: permit,
        }
    }

    /// Token stopping generation on this session.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run one user turn on the guarded session.
    pub fn prompt(&mut self, text: &str, config: &GenerationConfig) -> Result<String> {
        self.session
            .as_mut()
            .ok_or_else(|| anyhow!("session already released"))?
            .prompt(text, config, &self.cancel)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.dispose();
            tracing::debug!("inference session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_follows_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_drop_guard_cancels() {
        let token = CancelToken::new();
        let guard = token.drop_guard();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }
}
