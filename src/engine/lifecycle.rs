//! Model lifecycle management
//!
//! Owns the single loaded model and hands out scoped sessions against it.
//! Readiness is an explicit state checked synchronously on the request path,
//! so requests that arrive while the model is still loading fail fast.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::Semaphore;

use super::{CancelToken, ModelEngine, SessionGuard, SessionParams};
use crate::error::{InferenceError, InferenceResult};

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Loading,
    Ready,
    Disposed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Loading => "loading",
            LifecycleState::Ready => "ready",
            LifecycleState::Disposed => "disposed",
        };
        f.write_str(s)
    }
}

enum Slot {
    Uninitialized,
    Loading,
    Ready(Arc<dyn ModelEngine>),
    Disposed,
}

impl Slot {
    fn state(&self) -> LifecycleState {
        match self {
            Slot::Uninitialized => LifecycleState::Uninitialized,
            Slot::Loading => LifecycleState::Loading,
            Slot::Ready(_) => LifecycleState::Ready,
            Slot::Disposed => LifecycleState::Disposed,
        }
    }
}

/// Grace period for cancelled sessions to wind down after the drain timeout
const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of the process-wide model
///
/// - `load` runs once: `Uninitialized -> Loading -> Ready`
/// - `acquire_session` works only in `Ready`
/// - `shutdown` moves to `Disposed`, drains sessions (cancelling the ones
///   that outlive the drain timeout) and releases the model exactly once
pub struct ModelLifecycle {
    slot: RwLock<Slot>,
    /// Engine taken out of `Ready` by shutdown, waiting to be released
    retiring: Mutex<Option<Arc<dyn ModelEngine>>>,
    sessions: Arc<Semaphore>,
    max_sessions: usize,
    /// Parent of every session's cancel token
    stop: CancelToken,
}

impl ModelLifecycle {
    /// Create an empty lifecycle allowing `max_sessions` live sessions.
    pub fn new(max_sessions: usize) -> Self {
        let max_sessions = max_sessions.max(1);
        Self {
            slot: RwLock::new(Slot::Uninitialized),
            retiring: Mutex::new(None),
            sessions: Arc::new(Semaphore::new(max_sessions)),
            max_sessions,
            stop: CancelToken::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Sessions currently alive
    pub fn in_flight(&self) -> usize {
        self.max_sessions
            .saturating_sub(self.sessions.available_permits())
    }

    /// Load the model with `loader`.
    ///
    /// Fails if a load already happened or shutdown began. A failed load
    /// returns the lifecycle to `Uninitialized`. If shutdown begins while
    /// loading, the freshly loaded engine is released immediately.
    pub async fn load<F>(&self, loader: F) -> Result<()>
    where
        F: Future<Output = Result<Arc<dyn ModelEngine>>>,
    {
        {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            let state = slot.state();
            if state != LifecycleState::Uninitialized {
                return Err(anyhow!("cannot load model: lifecycle is {}", state));
            }
            *slot = Slot::Loading;
        }

        tracing::info!("Loading model...");
        let loaded = loader.await;

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        let still_loading = matches!(*slot, Slot::Loading);
        match (loaded, still_loading) {
            (Ok(engine), true) => {
                *slot = Slot::Ready(engine);
                tracing::info!("Model loaded, accepting inference requests");
                Ok(())
            }
            (Ok(engine), _) => {
                drop(slot);
                tracing::info!("Shutdown began during model load, releasing model");
                engine.release();
                Err(anyhow!("shutdown requested while the model was loading"))
            }
            (Err(err), true) => {
                *slot = Slot::Uninitialized;
                Err(err)
            }
            (Err(err), _) => Err(err),
        }
    }

    /// The ready engine, or `ModelNotReady`.
    pub fn engine(&self) -> InferenceResult<Arc<dyn ModelEngine>> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            Slot::Ready(engine) => Ok(Arc::clone(engine)),
            _ => Err(InferenceError::ModelNotReady),
        }
    }

    /// Open a scoped session.
    ///
    /// Waits for a free session slot, then creates the session on a blocking
    /// thread. The guard is built on that thread, so a session created for a
    /// caller that has gone away is still disposed.
    pub async fn acquire_session(&self, params: SessionParams) -> InferenceResult<SessionGuard> {
        // fail fast before queueing for a slot
        self.engine()?;

        let permit = Arc::clone(&self.sessions)
            .acquire_owned()
            .await
            .map_err(|_| InferenceError::ModelNotReady)?;

        // shutdown may have started while we waited
        let engine = self.engine()?;

        let cancel = self.stop.child();
        tokio::task::spawn_blocking(move || {
            engine
                .create_session(&params)
                .map(|session| SessionGuard::new(session, permit, cancel))
        })
        .await
        .map_err(InferenceError::generation)?
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to create inference session");
            InferenceError::generation(e)
        })
    }

    /// Stop handing out sessions. Requests from now on get `ModelNotReady`.
    pub fn begin_shutdown(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Slot::Ready(engine) = std::mem::replace(&mut *slot, Slot::Disposed) {
            *self.retiring.lock().unwrap_or_else(PoisonError::into_inner) = Some(engine);
        }
    }

    /// Shut down and release the model.
    ///
    /// Waits up to `drain` for in-flight sessions, then cancels the ones still
    /// running and gives them a short grace period before releasing the
    /// engine. Returns `true` for the call that performed the release; later
    /// calls are no-ops.
    pub async fn shutdown(&self, drain: Duration) -> bool {
        self.begin_shutdown();

        let engine = match self
            .retiring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(engine) => engine,
            None => return false,
        };

        let in_flight = self.in_flight();
        if in_flight > 0 {
            tracing::info!("Waiting for {} in-flight session(s)", in_flight);
        }

        if !self.drain(drain).await {
            tracing::warn!(
                "{} session(s) still running after {:?}, cancelling",
                self.in_flight(),
                drain
            );
            self.stop.cancel();
            if !self.drain(CANCEL_GRACE).await {
                tracing::warn!(
                    "{} session(s) ignored cancellation, releasing model anyway",
                    self.in_flight()
                );
            }
        }
        // wakes anything still queued for a slot with ModelNotReady
        self.sessions.close();

        engine.release();
        tracing::info!("Model released");
        true
    }

    /// Wait up to `within` for every session slot to be free.
    async fn drain(&self, within: Duration) -> bool {
        let all = self.sessions.acquire_many(self.max_sessions as u32);
        // permits go straight back; the state is already `Disposed`
        tokio::time::timeout(within, all).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::engine::testing::{Behavior, CountingEngine};

    fn params() -> SessionParams {
        SessionParams {
            context_size: 2048,
            system_prompt: "sys".to_string(),
        }
    }

    async fn ready(engine: &Arc<CountingEngine>, max_sessions: usize) -> Arc<ModelLifecycle> {
        let lifecycle = Arc::new(ModelLifecycle::new(max_sessions));
        let engine: Arc<dyn ModelEngine> = engine.clone();
        lifecycle.load(async move { Ok(engine) }).await.unwrap();
        lifecycle
    }

    #[tokio::test]
    async fn test_uninitialized_rejects_sessions() {
        let lifecycle = ModelLifecycle::new(1);
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        let result = lifecycle.acquire_session(params()).await;
        assert_eq!(result.err(), Some(InferenceError::ModelNotReady));
    }

    #[tokio::test]
    async fn test_loading_rejects_sessions_without_waiting() {
        let lifecycle = Arc::new(ModelLifecycle::new(1));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let engine = CountingEngine::new(Behavior::Echo);

        let loading = {
            let lifecycle = lifecycle.clone();
            let engine: Arc<dyn ModelEngine> = engine.clone();
            tokio::spawn(async move {
                lifecycle
                    .load(async move {
                        let _ = rx.await;
                        Ok(engine)
                    })
                    .await
            })
        };

        while lifecycle.state() != LifecycleState::Loading {
            tokio::task::yield_now().await;
        }
        let result = lifecycle.acquire_session(params()).await;
        assert_eq!(result.err(), Some(InferenceError::ModelNotReady));

        tx.send(()).unwrap();
        loading.await.unwrap().unwrap();
        assert!(lifecycle.is_ready());
    }

    #[tokio::test]
    async fn test_failed_load_returns_to_uninitialized() {
        let lifecycle = ModelLifecycle::new(1);
        let result = lifecycle
            .load(async { Err(anyhow!("file not found")) })
            .await;
        assert!(result.is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn test_second_load_is_rejected() {
        let engine = CountingEngine::new(Behavior::Echo);
        let lifecycle = ready(&engine, 1).await;
        let other: Arc<dyn ModelEngine> = CountingEngine::new(Behavior::Echo);
        assert!(lifecycle.load(async move { Ok(other) }).await.is_err());
        assert!(lifecycle.is_ready());
    }

    #[tokio::test]
    async fn test_session_released_on_drop() {
        let engine = CountingEngine::new(Behavior::Echo);
        let lifecycle = ready(&engine, 2).await;

        let mut session = lifecycle.acquire_session(params()).await.unwrap();
        assert_eq!(engine.live(), 1);
        assert_eq!(lifecycle.in_flight(), 1);

        let text = session.prompt("hello", &GenerationConfig::default()).unwrap();
        assert!(text.contains("hello"));

        drop(session);
        assert_eq!(engine.live(), 0);
        assert_eq!(engine.disposed(), 1);
        assert_eq!(lifecycle.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failed_session_creation_returns_permit() {
        let engine = CountingEngine::new(Behavior::FailCreate);
        let lifecycle = ready(&engine, 1).await;
        let result = lifecycle.acquire_session(params()).await;
        assert!(matches!(result, Err(InferenceError::GenerationFailed(_))));
        assert_eq!(lifecycle.in_flight(), 0);
        assert_eq!(engine.live(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_exactly_once() {
        let engine = CountingEngine::new(Behavior::Echo);
        let lifecycle = ready(&engine, 1).await;

        assert!(lifecycle.shutdown(Duration::from_secs(1)).await);
        assert!(!lifecycle.shutdown(Duration::from_secs(1)).await);
        assert_eq!(engine.released(), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Disposed);

        let result = lifecycle.acquire_session(params()).await;
        assert_eq!(result.err(), Some(InferenceError::ModelNotReady));
    }

    #[tokio::test]
    async fn test_shutdown_without_model_is_noop() {
        let lifecycle = ModelLifecycle::new(1);
        assert!(!lifecycle.shutdown(Duration::from_millis(10)).await);
        assert_eq!(lifecycle.state(), LifecycleState::Disposed);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_session() {
        let engine = CountingEngine::new(Behavior::Echo);
        let lifecycle = ready(&engine, 1).await;
        let session = lifecycle.acquire_session(params()).await.unwrap();

        let shutdown = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.shutdown(Duration::from_secs(5)).await })
        };

        // new requests are rejected while the session drains
        while lifecycle.state() != LifecycleState::Disposed {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            lifecycle.acquire_session(params()).await.err(),
            Some(InferenceError::ModelNotReady)
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(engine.released(), 0);

        drop(session);
        assert!(shutdown.await.unwrap());
        assert_eq!(engine.released(), 1);
        assert_eq!(engine.live(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_sessions_past_drain() {
        let engine = CountingEngine::new(Behavior::Slow(Duration::from_secs(30)));
        let lifecycle = ready(&engine, 1).await;
        let mut session = lifecycle.acquire_session(params()).await.unwrap();
        let generation = tokio::task::spawn_blocking(move || {
            session.prompt("hello", &GenerationConfig::default())
        });

        assert!(lifecycle.shutdown(Duration::from_millis(50)).await);
        assert_eq!(engine.live(), 0);
        assert_eq!(engine.disposed(), 1);
        assert_eq!(engine.released(), 1);
        assert!(generation.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_session_for_abandoned_caller_is_disposed() {
        let engine = CountingEngine::new(Behavior::SlowCreate(Duration::from_millis(200)));
        let lifecycle = ready(&engine, 1).await;

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), lifecycle.acquire_session(params()))
                .await;
        assert!(abandoned.is_err());

        // the slot comes back once the orphaned session is disposed
        assert!(lifecycle.shutdown(Duration::from_secs(5)).await);
        assert_eq!(engine.created(), 1);
        assert_eq!(engine.disposed(), 1);
        assert_eq!(engine.live(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_during_load_releases_loaded_model() {
        let lifecycle = Arc::new(ModelLifecycle::new(1));
        let engine = CountingEngine::new(Behavior::Echo);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let loading = {
            let lifecycle = lifecycle.clone();
            let engine: Arc<dyn ModelEngine> = engine.clone();
            tokio::spawn(async move {
                lifecycle
                    .load(async move {
                        let _ = rx.await;
                        Ok(engine)
                    })
                    .await
            })
        };
        while lifecycle.state() != LifecycleState::Loading {
            tokio::task::yield_now().await;
        }

        assert!(!lifecycle.shutdown(Duration::from_millis(10)).await);
        tx.send(()).unwrap();
        assert!(loading.await.unwrap().is_err());
        assert_eq!(engine.released(), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Disposed);
    }
}
