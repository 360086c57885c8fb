// tests/settings.rs

mod common;
use crate::common::{TestResult, init_tracing, passing};

use std::sync::Arc;

use hookrun::errors::HookrunError;
use hookrun::runnable::{DEFAULT_SLOW_MS, DEFAULT_TIMEOUT_MS, RETRIES_UNSET, parse_millis};
use hookrun::types::{Speed, TestState};
use hookrun::{Runnable, Test};
use hookrun_test_utils::fake_suite::FakeSuite;

#[test]
fn defaults() {
    let test = Test::new("defaults", Some(passing()));
    assert_eq!(test.timeout(), DEFAULT_TIMEOUT_MS);
    assert_eq!(test.slow(), DEFAULT_SLOW_MS);
    assert!(test.timeouts_enabled());
    assert_eq!(test.retries(), RETRIES_UNSET);
    assert_eq!(test.current_retry(), 0);
    assert_eq!(test.globals(), None);
    assert!(!test.allow_uncaught());
    assert_eq!(test.speed(), None);
}

#[test]
fn timeout_is_clamped() {
    let mut test = Test::new("clamped", Some(passing()));

    test.set_timeout(-10);
    assert_eq!(test.timeout(), 0);
    assert!(!test.timeouts_enabled());

    let mut test = Test::new("clamped", Some(passing()));
    test.set_timeout(i64::MAX);
    assert_eq!(test.timeout(), i32::MAX as u64);
    assert!(!test.timeouts_enabled());
}

#[test]
fn ordinary_timeout_does_not_reenable_enforcement() {
    let mut test = Test::new("stays off", Some(passing()));
    test.set_timeout(0);
    assert!(!test.timeouts_enabled());

    test.set_timeout(500);
    assert_eq!(test.timeout(), 500);
    assert!(!test.timeouts_enabled());

    test.enable_timeouts(true);
    assert!(test.timeouts_enabled());
}

#[test]
fn duration_strings() -> TestResult {
    let mut test = Test::new("strings", Some(passing()));
    test.set_timeout_str("3s")?.set_slow_str("250ms")?;
    assert_eq!(test.timeout(), 3_000);
    assert_eq!(test.slow(), 250);

    test.set_timeout_str("1500")?;
    assert_eq!(test.timeout(), 1_500);
    Ok(())
}

#[test]
fn unparsable_duration_is_an_invalid_argument() {
    let mut test = Test::new("bad", Some(passing()));
    let err = test.set_timeout_str("soon").map(|_| ()).expect_err("not a duration");
    match err {
        HookrunError::InvalidArgument { argument, .. } => assert_eq!(argument, "timeout"),
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
    assert_eq!(test.timeout(), DEFAULT_TIMEOUT_MS);
}

#[test]
fn parse_millis_units() {
    assert_eq!(parse_millis("250ms"), Ok(250));
    assert_eq!(parse_millis("2s"), Ok(2_000));
    assert_eq!(parse_millis("1m"), Ok(60_000));
    assert_eq!(parse_millis("1h"), Ok(3_600_000));
    assert_eq!(parse_millis(" 42 "), Ok(42));
    assert!(parse_millis("").is_err());
    assert!(parse_millis("ms").is_err());
    assert!(parse_millis("5 days").is_err());
    assert!(parse_millis("-5s").is_err());
}

#[test]
fn speed_buckets() {
    assert_eq!(Speed::classify(10, 75), Speed::Fast);
    assert_eq!(Speed::classify(37, 75), Speed::Fast);
    assert_eq!(Speed::classify(38, 75), Speed::Medium);
    assert_eq!(Speed::classify(75, 75), Speed::Medium);
    assert_eq!(Speed::classify(76, 75), Speed::Slow);
}

#[test]
fn speed_is_known_after_a_run() -> TestResult {
    init_tracing();

    let mut test = Test::new("fast", Some(passing()));
    test.set_slow(10_000);
    test.run(|_| {})?;
    assert_eq!(test.speed(), Some(Speed::Fast));
    Ok(())
}

#[test]
fn titles_join_the_parent_path() {
    let suite = Arc::new(FakeSuite::new(&["outer", "inner"]));
    let mut test = Test::new("leaf", Some(passing()));
    assert_eq!(test.full_title(), "leaf");

    test.set_parent(suite);
    assert_eq!(test.title_path(), vec!["outer", "inner", "leaf"]);
    assert_eq!(test.full_title(), "outer inner leaf");
}

#[test]
fn pending_follows_the_parent() {
    let suite = Arc::new(FakeSuite::new(&["suite"]));
    let mut test = Test::new("child", Some(passing()));
    test.set_parent(suite.clone());
    assert!(!test.is_pending());

    suite.set_pending(true);
    assert!(test.is_pending());
}

#[test]
fn verdict_queries_respect_pending() {
    let mut test = Test::new("judged", Some(passing()));
    assert!(!test.is_passed());
    assert!(!test.is_failed());

    test.set_state(TestState::Failed);
    assert!(test.is_failed());
    assert!(!test.is_passed());

    test.set_pending(true);
    assert!(!test.is_failed());
}

#[test]
fn test_state_parses_from_text() {
    assert_eq!("passed".parse::<TestState>(), Ok(TestState::Passed));
    assert_eq!(" Failed ".parse::<TestState>(), Ok(TestState::Failed));
    assert_eq!("pending".parse::<TestState>(), Ok(TestState::Pending));
    assert!("skipped".parse::<TestState>().is_err());
}

#[test]
fn bare_runnable_has_no_kind() {
    let runnable = Runnable::new("hook", Some(passing()));
    assert_eq!(runnable.kind(), None);
    assert!(!runnable.is_pending());

    let test = Test::new("test", Some(passing()));
    assert_eq!(test.runnable().kind().map(|k| k.as_str()), Some("test"));
}
