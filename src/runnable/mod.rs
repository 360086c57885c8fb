// src/runnable/mod.rs

//! One schedulable unit of test or hook execution.
//!
//! - [`settings`] holds timeout / slow / retry configuration.
//! - [`parent`] is the seam to the owning suite.
//! - [`run`] implements `Runnable::run`, the entry point of the engine.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::{RunState, RunStatus, StatusCell, UnexpectedSink};
use crate::errors::Result;
use crate::exec::{Context, ExecutionMode};
use crate::types::{Speed, TestState, UnitKind};

pub mod parent;
pub mod run;
pub mod settings;

pub use parent::Parent;
pub use settings::{DEFAULT_SLOW_MS, DEFAULT_TIMEOUT_MS, RETRIES_UNSET, Settings, parse_millis};

/// Separator between title path segments in [`Runnable::full_title`].
pub const TITLE_SEPARATOR: &str = " ";

/// A body plus everything needed to run it to exactly one outcome.
///
/// Configuration is mutated before `run`; the run state lives in a shared
/// [`StatusCell`] written only by the finalize gate.
#[derive(Debug)]
pub struct Runnable {
    title: String,
    body: Option<ExecutionMode>,
    kind: Option<UnitKind>,
    pending: bool,
    settings: Settings,
    parent: Option<Arc<dyn Parent>>,
    context: Context,
    state: Option<TestState>,
    status: StatusCell,
    unexpected: Option<UnexpectedSink>,
}

impl Runnable {
    pub fn new(title: impl Into<String>, body: Option<ExecutionMode>) -> Self {
        Self {
            title: title.into(),
            body,
            kind: None,
            pending: false,
            settings: Settings::default(),
            parent: None,
            context: Context::default(),
            state: None,
            status: StatusCell::new(),
            unexpected: None,
        }
    }

    /// Same title, body, settings, parent and context; fresh run state.
    pub(crate) fn fresh_copy(&self) -> Self {
        Self {
            title: self.title.clone(),
            body: self.body.clone(),
            kind: self.kind,
            pending: self.pending,
            settings: self.settings.clone(),
            parent: self.parent.clone(),
            context: self.context.clone(),
            state: None,
            status: StatusCell::new(),
            unexpected: self.unexpected.clone(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> Option<&ExecutionMode> {
        self.body.as_ref()
    }

    pub fn kind(&self) -> Option<UnitKind> {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: UnitKind) {
        self.kind = Some(kind);
    }

    // -- configuration ---------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn timeout(&self) -> u64 {
        self.settings.timeout()
    }

    pub fn set_timeout(&mut self, timeout_ms: i64) -> &mut Self {
        self.settings.set_timeout(timeout_ms);
        self
    }

    pub fn set_timeout_str(&mut self, timeout: &str) -> Result<&mut Self> {
        self.settings.set_timeout_str(timeout)?;
        Ok(self)
    }

    pub fn slow(&self) -> u64 {
        self.settings.slow()
    }

    pub fn set_slow(&mut self, slow_ms: u64) -> &mut Self {
        self.settings.set_slow(slow_ms);
        self
    }

    pub fn set_slow_str(&mut self, slow: &str) -> Result<&mut Self> {
        self.settings.set_slow_str(slow)?;
        Ok(self)
    }

    pub fn timeouts_enabled(&self) -> bool {
        self.settings.timeouts_enabled()
    }

    pub fn enable_timeouts(&mut self, enabled: bool) -> &mut Self {
        self.settings.enable_timeouts(enabled);
        self
    }

    pub fn retries(&self) -> i64 {
        self.settings.retries()
    }

    pub fn set_retries(&mut self, retries: i64) -> &mut Self {
        self.settings.set_retries(retries);
        self
    }

    pub fn current_retry(&self) -> u32 {
        self.settings.current_retry()
    }

    pub fn set_current_retry(&mut self, current_retry: u32) -> &mut Self {
        self.settings.set_current_retry(current_retry);
        self
    }

    pub fn globals(&self) -> Option<&[String]> {
        self.settings.globals()
    }

    pub fn set_globals(&mut self, globals: Vec<String>) -> &mut Self {
        self.settings.set_globals(globals);
        self
    }

    pub fn allow_uncaught(&self) -> bool {
        self.settings.allow_uncaught()
    }

    pub fn set_allow_uncaught(&mut self, allow: bool) -> &mut Self {
        self.settings.set_allow_uncaught(allow);
        self
    }

    pub fn set_pending(&mut self, pending: bool) -> &mut Self {
        self.pending = pending;
        self
    }

    pub fn parent(&self) -> Option<&Arc<dyn Parent>> {
        self.parent.as_ref()
    }

    pub fn set_parent(&mut self, parent: Arc<dyn Parent>) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn set_context(&mut self, context: Context) -> &mut Self {
        self.context = context;
        self
    }

    /// Where duplicate completions are reported, in addition to the log.
    pub fn set_unexpected_sink(&mut self, sink: UnexpectedSink) -> &mut Self {
        self.unexpected = Some(sink);
        self
    }

    // -- queries -----------------------------------------------------------

    /// Own flag, a skip raised by the body, or a pending parent.
    pub fn is_pending(&self) -> bool {
        self.pending
            || self.status.snapshot().skipped
            || self.parent.as_ref().is_some_and(|p| p.is_pending())
    }

    /// Record the aggregator's verdict for this unit.
    pub fn set_state(&mut self, state: TestState) {
        self.state = Some(state);
    }

    pub fn state(&self) -> Option<TestState> {
        self.state
    }

    pub fn is_failed(&self) -> bool {
        !self.is_pending() && self.state == Some(TestState::Failed)
    }

    pub fn is_passed(&self) -> bool {
        !self.is_pending() && self.state == Some(TestState::Passed)
    }

    pub fn title_path(&self) -> Vec<String> {
        let mut path = match &self.parent {
            Some(parent) => parent.title_path(),
            None => Vec::new(),
        };
        path.push(self.title.clone());
        path
    }

    pub fn full_title(&self) -> String {
        self.title_path().join(TITLE_SEPARATOR)
    }

    // -- run state ---------------------------------------------------------

    pub fn status(&self) -> RunStatus {
        self.status.snapshot()
    }

    pub fn run_state(&self) -> RunState {
        self.status.state()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.status.snapshot().duration
    }

    pub fn speed(&self) -> Option<Speed> {
        self.duration()
            .map(|d| Speed::classify(d.as_millis() as u64, self.settings.slow()))
    }

    /// Resolves once the current run is settled.
    pub async fn terminated(&self) -> RunState {
        self.status.terminated().await
    }
}
