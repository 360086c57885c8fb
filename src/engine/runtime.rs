// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use super::core::{FinalizeGate, Verdict};
use super::error::Outcome;
use super::{Signal, UnexpectedCompletion};

/// Sink for duplicate completions.
pub type UnexpectedSink = mpsc::UnboundedSender<UnexpectedCompletion>;

/// Races an asynchronous body's completion signals against its deadline.
///
/// This is the IO shell around [`FinalizeGate`]: it owns the signal
/// receiver and the deadline timer, feeds whichever wakes first into the
/// gate, and acts on the verdict. The body keeps running after a timeout;
/// the driver only stops *waiting* for it.
///
/// The driver stays alive after delivering the outcome so that late signals
/// can still be classified, and exits once every completion handle is gone.
pub struct Driver {
    gate: FinalizeGate,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
    unexpected: Option<UnexpectedSink>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Driver {
    pub fn new(
        gate: FinalizeGate,
        signal_rx: mpsc::UnboundedReceiver<Signal>,
        unexpected: Option<UnexpectedSink>,
    ) -> Self {
        Self {
            gate,
            signal_rx,
            unexpected,
        }
    }

    /// Main arbitration loop.
    ///
    /// - Signals from the body go through `FinalizeGate::finalize`.
    /// - Deadline expiry goes through `FinalizeGate::expire`.
    /// - `on_complete` is consumed by the first `Deliver` verdict, so it can
    ///   run at most once.
    pub async fn run<F>(mut self, on_complete: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let mut on_complete = Some(on_complete);

        debug!(
            test = %self.gate.title(),
            timeout_ms = self.gate.policy().timeout_ms,
            timeouts_enabled = self.gate.policy().enabled,
            "driver started"
        );

        loop {
            // Only race the deadline while a result is still owed.
            let deadline = if on_complete.is_some() {
                self.gate.deadline()
            } else {
                None
            };

            tokio::select! {
                biased;

                signal = self.signal_rx.recv() => match signal {
                    Some(Signal::Done(payload)) => {
                        let verdict = self.gate.finalize(payload, Instant::now());
                        self.apply(verdict, &mut on_complete);
                    }
                    Some(Signal::ResetTimeout(timeout_ms)) => {
                        self.gate.reset_timeout(timeout_ms, Instant::now());
                        debug!(
                            test = %self.gate.title(),
                            timeout_ms = self.gate.policy().timeout_ms,
                            "deadline reset"
                        );
                    }
                    None => {
                        self.handles_dropped(deadline, &mut on_complete).await;
                        break;
                    }
                },

                () = wait_deadline(deadline) => {
                    let verdict = self.gate.expire(Instant::now());
                    self.apply(verdict, &mut on_complete);
                }
            }
        }

        debug!(test = %self.gate.title(), "driver finished");
    }

    /// Every `Done` clone is gone. Nothing can signal any more, so only the
    /// deadline (if armed) can still settle the run.
    async fn handles_dropped<F>(&mut self, deadline: Option<Instant>, on_complete: &mut Option<F>)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        if on_complete.is_none() {
            return;
        }

        match deadline {
            Some(deadline) => {
                debug!(
                    test = %self.gate.title(),
                    "completion handles dropped without signalling; waiting for deadline"
                );
                sleep_until(deadline).await;
                let verdict = self.gate.expire(Instant::now());
                self.apply(verdict, on_complete);
            }
            None => {
                warn!(
                    test = %self.gate.title(),
                    "completion handles dropped without signalling and no deadline is armed; \
                     the run will never complete"
                );
            }
        }
    }

    fn apply<F>(&self, verdict: Verdict, on_complete: &mut Option<F>)
    where
        F: FnOnce(Outcome),
    {
        match verdict {
            Verdict::Deliver { outcome, duration } => {
                log_outcome(self.gate.title(), &outcome, duration.as_millis() as u64);
                if let Some(callback) = on_complete.take() {
                    callback(outcome);
                }
            }
            Verdict::Unexpected(failure) => {
                report_unexpected(
                    self.unexpected.as_ref(),
                    UnexpectedCompletion {
                        title: self.gate.title().to_string(),
                        failure,
                    },
                );
            }
            Verdict::Ignored => {
                debug!(
                    test = %self.gate.title(),
                    "completion signal after timeout; ignoring"
                );
            }
        }
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

pub(crate) fn log_outcome(title: &str, outcome: &Outcome, duration_ms: u64) {
    match outcome {
        Outcome::Passed => info!(test = %title, duration_ms, "passed"),
        Outcome::Skipped(pending) => info!(test = %title, reason = %pending, "skipped"),
        Outcome::Failed(failure) => {
            info!(test = %title, duration_ms, error = %failure, "failed")
        }
    }
}

pub(crate) fn report_unexpected(sink: Option<&UnexpectedSink>, event: UnexpectedCompletion) {
    warn!(test = %event.title, error = %event.failure, "unexpected completion signal");
    if let Some(sink) = sink {
        if sink.send(event).is_err() {
            debug!("unexpected-completion receiver dropped");
        }
    }
}
