// src/exec/body.rs

//! Executable bodies and the handles they receive.
//!
//! A body is either synchronous (it finishes when it returns) or
//! asynchronous (it finishes when it signals through its [`Done`] handle).
//! The mode is chosen explicitly at construction via [`ExecutionMode`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{Pending, RunState, Signal, StatusCell, Thrown};

/// What a body returns. `Err` is how a body "throws".
pub type BodyResult = Result<(), Thrown>;

pub type SyncBody = Arc<dyn Fn(&Context) -> BodyResult + Send + Sync>;
pub type AsyncBody = Arc<dyn Fn(&Context, Done) -> BodyResult + Send + Sync>;

/// A body together with how it reports completion.
#[derive(Clone)]
pub enum ExecutionMode {
    /// Completes when the function returns.
    Sync(SyncBody),
    /// Completes when the function signals through its `Done` handle.
    Async(AsyncBody),
}

impl ExecutionMode {
    pub fn sync<F>(body: F) -> Self
    where
        F: Fn(&Context) -> BodyResult + Send + Sync + 'static,
    {
        ExecutionMode::Sync(Arc::new(body))
    }

    pub fn with_done<F>(body: F) -> Self
    where
        F: Fn(&Context, Done) -> BodyResult + Send + Sync + 'static,
    {
        ExecutionMode::Async(Arc::new(body))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, ExecutionMode::Async(_))
    }
}

impl fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sync(_) => f.write_str("ExecutionMode::Sync(..)"),
            ExecutionMode::Async(_) => f.write_str("ExecutionMode::Async(..)"),
        }
    }
}

/// Execution context bound to a body. Opaque to the engine.
#[derive(Clone, Default)]
pub struct Context {
    inner: Option<Arc<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            inner: Some(Arc::new(value)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.inner.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("populated", &self.inner.is_some())
            .finish()
    }
}

/// Completion handle for asynchronous bodies.
///
/// Cheap to clone and `Send`, so it can be moved into spawned tasks. Every
/// call is forwarded to the run's driver; calling it more than once is
/// allowed and is reported as a duplicate completion rather than changing
/// the outcome.
#[derive(Debug, Clone)]
pub struct Done {
    tx: mpsc::UnboundedSender<Signal>,
    signalled: Arc<AtomicBool>,
    status: StatusCell,
}

impl Done {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Signal>, status: StatusCell) -> Self {
        Self {
            tx,
            signalled: Arc::new(AtomicBool::new(false)),
            status,
        }
    }

    /// Signal success.
    pub fn ok(&self) {
        self.call(None);
    }

    /// Signal failure with `thrown`.
    pub fn fail(&self, thrown: impl Into<Thrown>) {
        self.call(Some(thrown.into()));
    }

    /// Signal completion with an optional payload.
    pub fn call(&self, payload: Option<Thrown>) {
        self.signalled.store(true, Ordering::SeqCst);
        if self.tx.send(Signal::Done(payload)).is_err() {
            debug!("completion signal after the driver shut down; dropping");
        }
    }

    /// Signal a skip, and return the sentinel so the body can abort with
    /// `return Err(done.skip())`.
    pub fn skip(&self) -> Thrown {
        let pending = Pending::new("async skip; aborting execution");
        self.call(Some(Thrown::Skip(pending.clone())));
        Thrown::Skip(pending)
    }

    /// Replace the run's timeout; the new deadline counts from now.
    pub fn reset_timeout(&self, timeout_ms: i64) {
        if self.tx.send(Signal::ResetTimeout(timeout_ms)).is_err() {
            debug!("timeout reset after the driver shut down; dropping");
        }
    }

    /// Whether any clone of this handle has signalled completion.
    pub fn has_signalled(&self) -> bool {
        self.signalled.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RunState {
        self.status.state()
    }

    /// Resolves once the run is settled (completed or timed out).
    ///
    /// Bodies that own external work (processes, connections) can select
    /// on this to stop it after the engine gave up waiting.
    pub async fn terminated(&self) -> RunState {
        self.status.terminated().await
    }
}
