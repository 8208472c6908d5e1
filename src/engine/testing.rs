//! Resource-tracking engine double for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use super::{CancelToken, ChatSession, ModelEngine, SessionParams};
use crate::config::GenerationConfig;

/// How sessions of a [`CountingEngine`] behave.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Behavior {
    /// Answer with the prompt text.
    Echo,
    /// Answer after sleeping, polling the cancel token.
    Slow(Duration),
    /// Fail every prompt.
    FailPrompt,
    /// Panic inside the prompt.
    PanicPrompt,
    /// Refuse to create sessions.
    FailCreate,
    /// Sleep while creating the session, then echo.
    SlowCreate(Duration),
}

#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    peak: AtomicUsize,
    created: AtomicUsize,
    disposed: AtomicUsize,
    released: AtomicUsize,
}

/// Counts live sessions, disposals and releases.
pub(crate) struct CountingEngine {
    behavior: Behavior,
    counters: Arc<Counters>,
}

impl CountingEngine {
    pub(crate) fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            counters: Arc::default(),
        })
    }

    pub(crate) fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub(crate) fn disposed(&self) -> usize {
        self.counters.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }
}

impl ModelEngine for CountingEngine {
    fn create_session(&self, _params: &SessionParams) -> Result<Box<dyn ChatSession>> {
        match self.behavior {
            Behavior::FailCreate => bail!("context allocation failed"),
            Behavior::SlowCreate(duration) => std::thread::sleep(duration),
            _ => {}
        }
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(live, Ordering::SeqCst);
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            behavior: self.behavior,
            counters: Arc::clone(&self.counters),
            open: true,
        }))
    }

    fn release(&self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct CountingSession {
    behavior: Behavior,
    counters: Arc<Counters>,
    open: bool,
}

impl ChatSession for CountingSession {
    fn prompt(
        &mut self,
        text: &str,
        _config: &GenerationConfig,
        cancel: &CancelToken,
    ) -> Result<String> {
        match self.behavior {
            Behavior::Echo | Behavior::SlowCreate(_) => Ok(format!("definition for: {}", text)),
            Behavior::Slow(duration) => {
                let step = Duration::from_millis(5);
                let mut waited = Duration::ZERO;
                while waited < duration {
                    if cancel.is_cancelled() {
                        return Err(anyhow!("generation cancelled"));
                    }
                    std::thread::sleep(step);
                    waited += step;
                }
                Ok(format!("definition for: {}", text))
            }
            Behavior::FailPrompt => Err(anyhow!("decoder crashed")),
            Behavior::PanicPrompt => panic!("decoder panicked"),
            Behavior::FailCreate => unreachable!("sessions are never created"),
        }
    }

    fn dispose(&mut self) {
        if self.open {
            self.open = false;
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
            self.counters.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
