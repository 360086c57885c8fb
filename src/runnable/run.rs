// src/runnable/run.rs

//! `Runnable::run`: invoke the body and settle exactly one outcome.
//!
//! - Synchronous bodies settle before `run` returns; no timer is involved
//!   beyond the elapsed-time check in the gate.
//! - Asynchronous bodies are invoked inline, then a [`Driver`] is spawned on
//!   the current Tokio runtime to race the deadline against the body's
//!   `Done` signals. `run` returns as soon as the body returns.
//!
//! Unless `allow_uncaught` is set, whatever the body raises while being
//! invoked (an `Err` or a panic) is routed through the gate exactly as if
//! the body had reported it.

use std::panic::{self, AssertUnwindSafe};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::engine::runtime::log_outcome;
use crate::engine::{Driver, FinalizeGate, Outcome, RunError, Thrown, Verdict};
use crate::exec::{AsyncBody, BodyResult, Done, ExecutionMode, SyncBody};

use super::Runnable;

impl Runnable {
    /// Run the body once, calling `on_complete` exactly once with the outcome.
    ///
    /// Errors are returned only when the run cannot start (pending unit,
    /// second run, no runtime for an async body) or when `allow_uncaught`
    /// hands the body's error straight back; `on_complete` is not called in
    /// those cases.
    pub fn run<F>(&self, on_complete: F) -> Result<(), RunError>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let title = self.full_title();

        let body = match self.body() {
            Some(body) if !self.is_pending() => body,
            _ => return Err(RunError::Pending { title }),
        };

        let runtime = match body {
            ExecutionMode::Async(_) => match Handle::try_current() {
                Ok(handle) => Some(handle),
                Err(_) => return Err(RunError::NoRuntime { title }),
            },
            ExecutionMode::Sync(_) => None,
        };

        let mut gate = FinalizeGate::new(title.clone(), self.status.clone(), self.settings.policy());
        if !gate.begin(Instant::now()) {
            return Err(RunError::AlreadyStarted { title });
        }

        debug!(
            test = %title,
            is_async = body.is_async(),
            timeout_ms = self.timeout(),
            timeouts_enabled = self.timeouts_enabled(),
            retry = self.current_retry(),
            "run started"
        );

        match (body, runtime) {
            (ExecutionMode::Async(body), Some(runtime)) => {
                self.run_async(body, runtime, gate, on_complete)
            }
            (ExecutionMode::Sync(body), _) => self.run_sync(body, gate, on_complete),
            (ExecutionMode::Async(_), None) => Err(RunError::NoRuntime { title }),
        }
    }

    /// Convenience wrapper: run and await the outcome.
    ///
    /// Fails with [`RunError::Abandoned`] if the completion can never be
    /// delivered (every `Done` handle dropped without signalling and no
    /// deadline armed).
    pub async fn run_to_outcome(&self) -> Result<Outcome, RunError> {
        let (tx, rx) = oneshot::channel();
        self.run(move |outcome| {
            let _ = tx.send(outcome);
        })?;
        rx.await.map_err(|_| RunError::Abandoned {
            title: self.full_title(),
        })
    }

    fn run_sync<F>(&self, body: &SyncBody, mut gate: FinalizeGate, on_complete: F) -> Result<(), RunError>
    where
        F: FnOnce(Outcome),
    {
        let payload = match self.invoke(|| body(self.context())) {
            Ok(()) => None,
            Err(thrown) if self.allow_uncaught() && !thrown.is_skip() => {
                return Err(RunError::Uncaught {
                    title: gate.title().to_string(),
                    thrown,
                });
            }
            Err(thrown) => Some(thrown),
        };

        match gate.finalize(payload, Instant::now()) {
            Verdict::Deliver { outcome, duration } => {
                log_outcome(gate.title(), &outcome, duration.as_millis() as u64);
                on_complete(outcome);
            }
            // The gate was begun above and nothing else holds it.
            other => warn!(test = %gate.title(), verdict = ?other, "synchronous run did not settle"),
        }
        Ok(())
    }

    fn run_async<F>(
        &self,
        body: &AsyncBody,
        runtime: Handle,
        gate: FinalizeGate,
        on_complete: F,
    ) -> Result<(), RunError>
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let done = Done::new(signal_tx, self.status.clone());

        match self.invoke(|| body(self.context(), done.clone())) {
            Ok(()) => {}
            // `Done::skip` already signalled; the returned sentinel only
            // unwinds the body.
            Err(Thrown::Skip(_)) if done.has_signalled() => {}
            Err(thrown) if self.allow_uncaught() && !thrown.is_skip() => {
                return Err(RunError::Uncaught {
                    title: gate.title().to_string(),
                    thrown,
                });
            }
            Err(thrown) => done.fail(thrown),
        }
        drop(done);

        let driver = Driver::new(gate, signal_rx, self.unexpected.clone());
        runtime.spawn(driver.run(on_complete));
        Ok(())
    }

    /// Call the body, turning panics into thrown values unless
    /// `allow_uncaught` is set.
    fn invoke<B>(&self, body: B) -> BodyResult
    where
        B: FnOnce() -> BodyResult,
    {
        if self.allow_uncaught() {
            return body();
        }
        panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| Err(Thrown::from_panic(payload)))
    }
}
