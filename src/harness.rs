// src/harness.rs

//! Sequential harness used by the `hookrun` binary.
//!
//! This is the orchestrator side of the engine's contract: it builds tests
//! from config, runs them strictly one after another, retries failures on a
//! fresh clone, and records the aggregate result. It never runs two bodies
//! at the same time.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{SuiteSection, TestSpec};
use crate::engine::{Outcome, RunError, UnexpectedCompletion};
use crate::exec::command_body;
use crate::runnable::Parent;
use crate::testcase::Test;
use crate::types::TestState;

/// Parent for every test loaded from one config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigSuite {
    title: Option<String>,
    pending: bool,
}

impl ConfigSuite {
    pub fn new(title: Option<String>, pending: bool) -> Self {
        Self { title, pending }
    }

    pub fn from_section(section: &SuiteSection) -> Self {
        Self::new(section.title.clone(), section.pending)
    }
}

impl Parent for ConfigSuite {
    fn is_pending(&self) -> bool {
        self.pending
    }

    fn title_path(&self) -> Vec<String> {
        self.title.iter().cloned().collect()
    }
}

/// Build a test from a resolved spec. Tests without `cmd` are pending.
pub fn build_test(spec: &TestSpec, parent: Arc<dyn Parent>) -> Test {
    let body = spec
        .cmd
        .as_ref()
        .map(|cmd| command_body(spec.title.clone(), cmd.clone()));

    let mut test = Test::new(spec.title.clone(), body);
    test.enable_timeouts(spec.enable_timeouts)
        .set_timeout(spec.timeout_ms)
        .set_slow(spec.slow_ms)
        .set_retries(spec.retries)
        .set_allow_uncaught(spec.allow_uncaught)
        .set_parent(parent);
    if let Some(globals) = &spec.globals {
        test.set_globals(globals.clone());
    }
    test
}

/// Run `test` on fresh clones until it passes, is skipped, or runs out of
/// retries. `test` itself is never run.
pub async fn run_with_retries(test: &Test) -> Result<Outcome, RunError> {
    let mut attempt = test.clone_test();

    loop {
        let outcome = attempt.run_to_outcome().await?;

        let allowed = attempt.retries().max(0) as u64;
        let used = u64::from(attempt.current_retry());
        if !(outcome.is_failed() && used < allowed) {
            return Ok(outcome);
        }

        warn!(
            test = %attempt.full_title(),
            retry = used + 1,
            retries = allowed,
            error = %outcome.failure().map(ToString::to_string).unwrap_or_default(),
            "attempt failed; retrying on a fresh copy"
        );

        let mut next = attempt.clone_test();
        next.set_current_retry(attempt.current_retry() + 1);
        attempt = next;
    }
}

/// Aggregate result of a harness run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    /// Duplicate completions already queued on the secondary channel when
    /// [`Harness::finish`] ran. Duplicates that arrive later (from a body
    /// still running in the background) are only logged, not counted.
    pub unexpected: usize,
    /// `(full title, message)` for every failed test.
    pub failures: Vec<(String, String)>,
}

/// Runs tests one at a time and keeps the tally.
#[derive(Debug)]
pub struct Harness {
    suite: Arc<dyn Parent>,
    unexpected_tx: mpsc::UnboundedSender<UnexpectedCompletion>,
    unexpected_rx: mpsc::UnboundedReceiver<UnexpectedCompletion>,
    summary: Summary,
}

impl Harness {
    pub fn new(suite: Arc<dyn Parent>) -> Self {
        let (unexpected_tx, unexpected_rx) = mpsc::unbounded_channel();
        Self {
            suite,
            unexpected_tx,
            unexpected_rx,
            summary: Summary::default(),
        }
    }

    pub fn suite(&self) -> Arc<dyn Parent> {
        Arc::clone(&self.suite)
    }

    pub async fn run_spec(&mut self, spec: &TestSpec) -> TestState {
        let mut test = build_test(spec, self.suite());
        self.run_test(&mut test).await
    }

    /// Run one test (with retries) and record its state on it.
    pub async fn run_test(&mut self, test: &mut Test) -> TestState {
        let title = test.full_title();

        if test.is_pending() {
            info!(test = %title, "pending; not run");
            self.summary.pending += 1;
            test.set_state(TestState::Pending);
            return TestState::Pending;
        }

        test.set_unexpected_sink(self.unexpected_tx.clone());

        let state = match run_with_retries(test).await {
            Ok(Outcome::Passed) => {
                self.summary.passed += 1;
                TestState::Passed
            }
            Ok(Outcome::Skipped(_)) => {
                self.summary.pending += 1;
                TestState::Pending
            }
            Ok(Outcome::Failed(failure)) => {
                self.record_failure(&title, failure.to_string());
                TestState::Failed
            }
            Err(err) => {
                warn!(test = %title, error = %err, "run did not produce an outcome");
                self.record_failure(&title, err.to_string());
                TestState::Failed
            }
        };

        test.set_state(state);
        state
    }

    fn record_failure(&mut self, title: &str, message: String) {
        self.summary.failed += 1;
        self.summary.failures.push((title.to_string(), message));
    }

    /// Drain queued secondary-channel events and return the tally.
    ///
    /// Does not wait for drivers that are still alive; see
    /// [`Summary::unexpected`].
    pub fn finish(mut self) -> Summary {
        while let Ok(event) = self.unexpected_rx.try_recv() {
            warn!(test = %event.title, error = %event, "unexpected completion recorded");
            self.summary.unexpected += 1;
        }
        self.summary
    }
}
