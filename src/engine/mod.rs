// src/engine/mod.rs

//! Completion arbitration for a single runnable.
//!
//! This module ties together:
//! - the shared run-state cell ([`state`])
//! - the pure finalize gate that decides what each signal means ([`core`])
//! - the async driver that races the deadline against the body's
//!   completion signals ([`runtime`])
//! - the error taxonomy delivered to callers ([`error`])

use std::fmt;

pub mod core;
pub mod error;
pub mod runtime;
pub mod state;

pub use core::{FinalizeGate, MAX_TIMEOUT_MS, TimeoutPolicy, Verdict, is_disabling_timeout};
pub use error::{BodyError, Failure, Outcome, Pending, RunError, Thrown};
pub use runtime::{Driver, UnexpectedSink};
pub use state::{RunState, RunStatus, StatusCell};

/// Signals flowing from a body's completion handle into the driver.
#[derive(Debug)]
pub enum Signal {
    /// The body called its completion callback, optionally with an error.
    Done(Option<Thrown>),
    /// The body asked for a new timeout, counted from now.
    ResetTimeout(i64),
}

/// Secondary-channel notification: a completion arrived after the unit had
/// already completed. Not a failure of the run itself.
#[derive(Debug)]
pub struct UnexpectedCompletion {
    pub title: String,
    pub failure: Failure,
}

impl fmt::Display for UnexpectedCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.failure)
    }
}
