// src/engine/state.rs

//! Single shared run-state cell.
//!
//! All terminal-state bookkeeping for one runnable lives in one
//! `tokio::sync::watch` value. Writes go through
//! [`StatusCell::transition`], which inspects and updates the value under
//! the channel's lock, so the exactly-once guarantee holds even when signals
//! originate on other threads.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Execution state of one `run` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    CompletedSuccess,
    CompletedFailure,
    TimedOut,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::CompletedSuccess | RunState::CompletedFailure | RunState::TimedOut
        )
    }

    pub fn is_completed(self) -> bool {
        matches!(self, RunState::CompletedSuccess | RunState::CompletedFailure)
    }
}

/// Snapshot of a runnable's run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    pub state: RunState,
    /// Recorded once, by whichever signal settled the run.
    pub duration: Option<Duration>,
    /// The run settled because the body asked to be skipped.
    pub skipped: bool,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            duration: None,
            skipped: false,
        }
    }
}

/// Shared handle to a [`RunStatus`].
#[derive(Debug, Clone)]
pub struct StatusCell {
    tx: Arc<watch::Sender<RunStatus>>,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunStatus::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> RunStatus {
        *self.tx.borrow()
    }

    pub fn state(&self) -> RunState {
        self.tx.borrow().state
    }

    /// Inspect and possibly rewrite the status atomically.
    ///
    /// `f` returns `true` when it modified the status; watchers are only
    /// woken in that case.
    pub fn transition<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut RunStatus) -> bool,
    {
        self.tx.send_if_modified(f)
    }

    /// Wait until the run reaches a terminal state.
    pub async fn terminated(&self) -> RunState {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(|status| status.state.is_terminal()).await {
            Ok(status) => status.state,
            // The sender lives in `self`, so the channel cannot close while
            // we hold it.
            Err(_) => self.state(),
        }
    }
}
