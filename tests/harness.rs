// tests/harness.rs

mod common;
use crate::common::{TestResult, counting_test, init_tracing};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hookrun::engine::{Failure, Outcome, RunError, Thrown};
use hookrun::harness::{ConfigSuite, Harness, build_test, run_with_retries};
use hookrun::runnable::Parent;
use hookrun::types::TestState;
use hookrun::{ExecutionMode, Test};
use hookrun_test_utils::builders::{ConfigFileBuilder, TestConfigBuilder};

/// Sync test that fails until it has been invoked `fail_times` times.
fn flaky(title: &str, fail_times: usize, calls: &Arc<AtomicUsize>) -> Test {
    let calls = Arc::clone(calls);
    Test::new(
        title,
        Some(ExecutionMode::sync(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < fail_times {
                Err(Thrown::msg(format!("attempt {n} failed")))
            } else {
                Ok(())
            }
        })),
    )
}

fn suite(title: &str) -> Arc<dyn Parent> {
    Arc::new(ConfigSuite::new(Some(title.to_string()), false))
}

#[tokio::test]
async fn retries_until_the_test_passes() -> TestResult {
    init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut test = flaky("flaky", 2, &calls);
    test.set_retries(2);

    let outcome = run_with_retries(&test).await?;
    assert!(outcome.is_passed());
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // The template itself never runs.
    assert_eq!(test.duration(), None);
    Ok(())
}

#[tokio::test]
async fn gives_up_after_the_configured_retries() -> TestResult {
    init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut test = flaky("always broken", usize::MAX, &calls);
    test.set_retries(1);

    let outcome = run_with_retries(&test).await?;
    assert_eq!(
        outcome.failure().map(ToString::to_string).as_deref(),
        Some("attempt 1 failed")
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn unset_retries_means_one_attempt() -> TestResult {
    init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let test = flaky("once", usize::MAX, &calls);

    let outcome = run_with_retries(&test).await?;
    assert!(outcome.is_failed());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn uncaught_errors_are_not_retried() {
    init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut test = flaky("raw", usize::MAX, &calls);
    test.set_retries(3).set_allow_uncaught(true);

    let err = run_with_retries(&test).await.expect_err("error escapes");
    assert!(matches!(err, RunError::Uncaught { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn harness_tallies_outcomes() {
    init_tracing();

    let mut harness = Harness::new(suite("tally"));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut passing = counting_test("passes", &calls);
    passing.set_parent(harness.suite());
    assert_eq!(harness.run_test(&mut passing).await, TestState::Passed);
    assert!(passing.is_passed());

    let mut failing = flaky("fails", usize::MAX, &Arc::new(AtomicUsize::new(0)));
    failing.set_parent(harness.suite());
    assert_eq!(harness.run_test(&mut failing).await, TestState::Failed);
    assert!(failing.is_failed());

    let mut skipping = Test::new("skips", Some(ExecutionMode::sync(|_| Err(Thrown::skip()))));
    assert_eq!(harness.run_test(&mut skipping).await, TestState::Pending);

    let mut todo = Test::new("todo", None);
    assert_eq!(harness.run_test(&mut todo).await, TestState::Pending);

    let summary = harness.finish();
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.unexpected, 0);
    assert_eq!(
        summary.failures,
        vec![("tally fails".to_string(), "attempt 0 failed".to_string())]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pending_suite_runs_nothing() {
    init_tracing();

    let mut harness = Harness::new(Arc::new(ConfigSuite::new(None, true)));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut test = counting_test("inside", &calls);
    test.set_parent(harness.suite());

    assert_eq!(harness.run_test(&mut test).await, TestState::Pending);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.finish().pending, 1);
}

#[tokio::test]
async fn harness_counts_duplicate_completions() {
    init_tracing();

    let mut harness = Harness::new(suite("dupes"));
    let mut test = Test::new(
        "twice",
        Some(ExecutionMode::with_done(|_, done| {
            done.ok();
            done.ok();
            Ok(())
        })),
    );

    assert_eq!(harness.run_test(&mut test).await, TestState::Passed);
    let summary = harness.finish();
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.unexpected, 1);
}

#[tokio::test(start_paused = true)]
async fn duplicates_after_finish_are_not_counted() {
    init_tracing();

    let mut harness = Harness::new(suite("late dupes"));
    let mut test = Test::new(
        "late second call",
        Some(ExecutionMode::with_done(|_, done| {
            done.ok();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                done.ok();
            });
            Ok(())
        })),
    );

    assert_eq!(harness.run_test(&mut test).await, TestState::Passed);
    let summary = harness.finish();
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.unexpected, 0);

    // The late call still settles without panicking once the summary is gone.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}

#[test]
fn build_test_applies_resolved_settings() {
    let cfg = ConfigFileBuilder::new()
        .with_suite_title("smoke")
        .with_test(
            "unbounded",
            TestConfigBuilder::new("true")
                .title("never times out")
                .timeout_ms(0)
                .slow("2s")
                .retries(4)
                .globals(&["PATH"])
                .build(),
        )
        .with_test("todo", TestConfigBuilder::pending().build())
        .build();

    let parent: Arc<dyn Parent> = Arc::new(ConfigSuite::from_section(&cfg.suite));

    let spec = cfg.find("unbounded").expect("spec");
    let test = build_test(spec, Arc::clone(&parent));
    assert_eq!(test.full_title(), "smoke never times out");
    assert_eq!(test.timeout(), 0);
    assert!(!test.timeouts_enabled());
    assert_eq!(test.slow(), 2_000);
    assert_eq!(test.retries(), 4);
    assert_eq!(test.globals(), Some(&["PATH".to_string()][..]));
    assert!(test.body().is_some_and(ExecutionMode::is_async));

    let todo = build_test(cfg.find("todo").expect("spec"), parent);
    assert!(todo.is_pending());
}

#[cfg(unix)]
mod commands {
    use super::*;

    fn command_test(key: &str, cmd: &str, timeout_ms: i64) -> Test {
        let cfg = ConfigFileBuilder::new()
            .with_test(key, TestConfigBuilder::new(cmd).timeout_ms(timeout_ms).build())
            .build();
        build_test(cfg.find(key).expect("spec"), suite("cmd"))
    }

    #[tokio::test]
    async fn successful_command_passes() -> TestResult {
        init_tracing();

        let test = command_test("ok", "true", 5_000);
        let outcome = test.run_to_outcome().await?;
        assert!(outcome.is_passed(), "got {outcome:?}");
        Ok(())
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code() -> TestResult {
        init_tracing();

        let test = command_test("bad", "exit 3", 5_000);
        let outcome = test.run_to_outcome().await?;
        assert_eq!(
            outcome.failure().map(ToString::to_string).as_deref(),
            Some("command `exit 3` exited with code 3")
        );
        Ok(())
    }

    #[tokio::test]
    async fn non_utf8_output_does_not_fail_the_command() -> TestResult {
        init_tracing();

        // Invalid UTF-8 first, then more output than a pipe buffer holds.
        let test = command_test(
            "binary",
            "printf '\\377\\376\\n'; head -c 400000 /dev/zero | tr '\\0' 'a'; echo; exit 0",
            10_000,
        );
        let outcome = test.run_to_outcome().await?;
        assert!(outcome.is_passed(), "got {outcome:?}");
        Ok(())
    }

    #[tokio::test]
    async fn hanging_command_times_out() -> TestResult {
        init_tracing();

        let test = command_test("hangs", "sleep 5", 100);
        let outcome = test.run_to_outcome().await?;
        match outcome {
            Outcome::Failed(Failure::Timeout { timeout_ms }) => assert_eq!(timeout_ms, 100),
            other => panic!("expected timeout, got {other:?}"),
        }
        Ok(())
    }
}
