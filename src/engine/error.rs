// src/engine/error.rs

//! What a body can raise, and what the engine turns it into.
//!
//! A body "throws" by returning `Err(Thrown)` (or by panicking). Whatever it
//! throws is normalized into an [`Outcome`] before it reaches the completion
//! callback:
//!
//! - Error-like values become [`Failure::Body`] verbatim.
//! - Anything else (`Value::Undefined`, numbers, strings...) becomes
//!   [`Failure::InvalidException`], keeping the value and its type tag.
//! - [`Pending`] is not a failure at all and becomes [`Outcome::Skipped`].

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::types::Value;

/// An Error-like value produced by a body.
#[derive(Debug, Error)]
#[error("{inner}")]
pub struct BodyError {
    inner: anyhow::Error,
}

impl BodyError {
    /// Build from a plain message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            inner: anyhow::Error::msg(message),
        }
    }

    /// Wrap any standard error.
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: anyhow::Error::new(err),
        }
    }

    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl From<anyhow::Error> for BodyError {
    fn from(inner: anyhow::Error) -> Self {
        Self { inner }
    }
}

/// Cooperative skip sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Pending {
    message: String,
}

impl Pending {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for Pending {
    fn default() -> Self {
        Pending::new("sync skip; aborting execution")
    }
}

/// Anything a body can raise.
#[derive(Debug, Error)]
pub enum Thrown {
    #[error(transparent)]
    Error(BodyError),

    #[error("{0} was thrown")]
    Value(Value),

    #[error(transparent)]
    Skip(Pending),
}

impl Thrown {
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Thrown::Error(BodyError::msg(message))
    }

    pub fn error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Thrown::Error(BodyError::new(err))
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Thrown::Value(value.into())
    }

    /// The skip sentinel for synchronous bodies: `return Err(Thrown::skip())`.
    pub fn skip() -> Self {
        Thrown::Skip(Pending::default())
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Thrown::Skip(_))
    }

    /// Recover a thrown value from a caught panic payload.
    ///
    /// String payloads (the `panic!("...")` case) are Error-like. A payload
    /// that is itself a `Thrown` or `Value` (via `std::panic::panic_any`) is
    /// taken as-is; primitive payloads become the matching `Value`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<Thrown>() {
            Ok(thrown) => return *thrown,
            Err(p) => p,
        };
        let payload = match payload.downcast::<Value>() {
            Ok(value) => return Thrown::Value(*value),
            Err(p) => p,
        };
        if let Some(s) = payload.downcast_ref::<&'static str>() {
            return Thrown::msg(*s);
        }
        if let Some(s) = payload.downcast_ref::<String>() {
            return Thrown::msg(s.clone());
        }
        if let Some(n) = payload.downcast_ref::<i32>() {
            return Thrown::Value(Value::from(*n));
        }
        if let Some(n) = payload.downcast_ref::<i64>() {
            return Thrown::Value(Value::from(*n));
        }
        if let Some(n) = payload.downcast_ref::<f64>() {
            return Thrown::Value(Value::from(*n));
        }
        if let Some(b) = payload.downcast_ref::<bool>() {
            return Thrown::Value(Value::from(*b));
        }
        Thrown::Value(Value::Undefined)
    }
}

impl From<anyhow::Error> for Thrown {
    fn from(err: anyhow::Error) -> Self {
        Thrown::Error(BodyError::from(err))
    }
}

impl From<BodyError> for Thrown {
    fn from(err: BodyError) -> Self {
        Thrown::Error(err)
    }
}

impl From<Pending> for Thrown {
    fn from(pending: Pending) -> Self {
        Thrown::Skip(pending)
    }
}

impl From<Value> for Thrown {
    fn from(value: Value) -> Self {
        Thrown::Value(value)
    }
}

/// Why a run did not pass.
#[derive(Debug, Error)]
pub enum Failure {
    /// The body's own error, propagated verbatim.
    #[error(transparent)]
    Body(BodyError),

    /// The body raised something that is not an error.
    #[error("the {type_tag} {value} was thrown, throw an Error :)")]
    InvalidException { value: Value, type_tag: &'static str },

    /// Deadline expiry, or a completion that arrived after the deadline.
    #[error(
        "Timeout of {timeout_ms}ms exceeded. Ensure the done() callback is being called in this test."
    )]
    Timeout { timeout_ms: u64 },

    /// A completion signal arrived after the unit had already completed.
    #[error("done() called multiple times in {title:?}{}", with_error(.extra))]
    MultipleCompletion { title: String, extra: Option<String> },
}

fn with_error(extra: &Option<String>) -> String {
    match extra {
        Some(message) => format!(" with error: {message}"),
        None => String::new(),
    }
}

impl Failure {
    /// Normalize a thrown value. `Err` carries the skip sentinel, which is
    /// not a failure.
    pub fn from_thrown(thrown: Thrown) -> Result<Failure, Pending> {
        match thrown {
            Thrown::Error(err) => Ok(Failure::Body(err)),
            Thrown::Value(value) => Ok(Failure::InvalidException {
                type_tag: value.type_tag(),
                value,
            }),
            Thrown::Skip(pending) => Err(pending),
        }
    }

    /// Build the duplicate-completion error for an extra signal.
    ///
    /// The extra signal's payload goes through the same normalization as a
    /// first signal before its message is folded in, so `done(42)` twice
    /// reports the invalid-exception text rather than a bare `42`.
    pub fn multiple_completion(title: impl Into<String>, extra: Option<Thrown>) -> Failure {
        let extra = extra.map(|thrown| match Failure::from_thrown(thrown) {
            Ok(failure) => failure.to_string(),
            Err(pending) => pending.to_string(),
        });
        Failure::MultipleCompletion {
            title: title.into(),
            extra,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Failure::Timeout { .. })
    }
}

/// Terminal result of one run.
#[derive(Debug)]
pub enum Outcome {
    Passed,
    Failed(Failure),
    /// The body asked to be skipped. Aggregators should count this as
    /// pending, never as a failure.
    Skipped(Pending),
}

impl Outcome {
    /// Outcome for a completion signal that carried `signal` as its payload.
    pub fn from_signal(signal: Option<Thrown>) -> Outcome {
        match signal {
            None => Outcome::Passed,
            Some(thrown) => match Failure::from_thrown(thrown) {
                Ok(failure) => Outcome::Failed(failure),
                Err(pending) => Outcome::Skipped(pending),
            },
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Error-shaped view: `None` for a pass, the failure or the skip
    /// sentinel otherwise.
    pub fn error(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed(failure) => Some(failure),
            Outcome::Skipped(pending) => Some(pending),
        }
    }
}

/// Reasons `run` refuses to start or hands an error straight back.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{title:?} is pending and must not be run")]
    Pending { title: String },

    #[error("{title:?} has already been run; clone it for another attempt")]
    AlreadyStarted { title: String },

    #[error("{title:?} has an asynchronous body but no Tokio runtime is available")]
    NoRuntime { title: String },

    /// `allow_uncaught` is set and the body raised.
    #[error("uncaught error in {title:?}: {thrown}")]
    Uncaught {
        title: String,
        #[source]
        thrown: Thrown,
    },

    /// Every completion handle was dropped before a result was delivered.
    #[error("{title:?} never delivered a completion")]
    Abandoned { title: String },
}

impl RunError {
    /// The body's raw value for an uncaught error.
    pub fn into_thrown(self) -> Option<Thrown> {
        match self {
            RunError::Uncaught { thrown, .. } => Some(thrown),
            _ => None,
        }
    }
}
