#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hookrun::{ExecutionMode, Test};

pub use hookrun_test_utils::init_tracing;
pub use hookrun_test_utils::recorder::OutcomeRecorder;

pub type TestResult = Result<(), Box<dyn Error>>;

/// Sync body that passes.
pub fn passing() -> ExecutionMode {
    ExecutionMode::sync(|_| Ok(()))
}

/// Sync test whose body bumps `calls` every time it is invoked.
pub fn counting_test(title: &str, calls: &Arc<AtomicUsize>) -> Test {
    let calls = Arc::clone(calls);
    Test::new(
        title,
        Some(ExecutionMode::sync(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })),
    )
}
