// src/testcase.rs

//! `Test`: a runnable whose pending flag comes from whether it has a body.

use std::ops::{Deref, DerefMut};

use tracing::trace;

use crate::errors::{HookrunError, Result};
use crate::exec::ExecutionMode;
use crate::runnable::Runnable;
use crate::types::{UnitKind, Value};

#[derive(Debug)]
pub struct Test {
    runnable: Runnable,
}

impl Test {
    /// A test without a body is pending.
    pub fn new(title: impl Into<String>, body: Option<ExecutionMode>) -> Self {
        let pending = body.is_none();
        let mut runnable = Runnable::new(title, body);
        runnable.set_pending(pending);
        runnable.set_kind(UnitKind::Test);
        Self { runnable }
    }

    /// Build from a dynamically typed title, as handed over by discovery
    /// layers that read titles from data files.
    pub fn try_new(title: impl Into<Value>, body: Option<ExecutionMode>) -> Result<Self> {
        match title.into() {
            Value::String(title) => Ok(Test::new(title, body)),
            other => Err(HookrunError::invalid_type("title", "string", other.type_tag())),
        }
    }

    /// Fresh, unexecuted copy for another attempt.
    ///
    /// Title, body, timeout, slow, timeout enablement, retries, current
    /// retry, globals, parent and context are carried over; the run state
    /// starts at `Idle` again. The original is left untouched.
    pub fn clone_test(&self) -> Test {
        trace!(test = %self.full_title(), retry = self.current_retry(), "cloning test");
        Test {
            runnable: self.runnable.fresh_copy(),
        }
    }

    pub fn runnable(&self) -> &Runnable {
        &self.runnable
    }

    pub fn runnable_mut(&mut self) -> &mut Runnable {
        &mut self.runnable
    }

    pub fn into_runnable(self) -> Runnable {
        self.runnable
    }
}

impl Deref for Test {
    type Target = Runnable;

    fn deref(&self) -> &Runnable {
        &self.runnable
    }
}

impl DerefMut for Test {
    fn deref_mut(&mut self) -> &mut Runnable {
        &mut self.runnable
    }
}
