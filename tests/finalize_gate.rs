// tests/finalize_gate.rs
//
// The gate is pure: every test passes explicit instants and never sleeps.

mod common;
use crate::common::init_tracing;

use std::time::Duration;

use tokio::time::Instant;

use hookrun::engine::{
    Failure, FinalizeGate, Outcome, RunState, StatusCell, Thrown, TimeoutPolicy, Verdict,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn started_gate(timeout_ms: i64) -> (FinalizeGate, StatusCell, Instant) {
    let status = StatusCell::new();
    let mut gate = FinalizeGate::new(
        "gate",
        status.clone(),
        TimeoutPolicy::from_millis(timeout_ms, true),
    );
    let t0 = Instant::now();
    assert!(gate.begin(t0));
    (gate, status, t0)
}

#[test]
fn begin_only_succeeds_once() {
    init_tracing();

    let (mut gate, status, t0) = started_gate(50);
    assert_eq!(status.state(), RunState::Running);
    assert!(!gate.begin(t0 + ms(1)));
}

#[test]
fn first_success_is_delivered_with_duration() {
    init_tracing();

    let (mut gate, status, t0) = started_gate(50);
    match gate.finalize(None, t0 + ms(10)) {
        Verdict::Deliver { outcome, duration } => {
            assert!(outcome.is_passed());
            assert_eq!(duration, ms(10));
        }
        other => panic!("expected delivery, got {other:?}"),
    }
    let snapshot = status.snapshot();
    assert_eq!(snapshot.state, RunState::CompletedSuccess);
    assert_eq!(snapshot.duration, Some(ms(10)));
}

#[test]
fn success_past_the_deadline_becomes_a_timeout() {
    init_tracing();

    let (mut gate, status, t0) = started_gate(50);
    match gate.finalize(None, t0 + ms(51)) {
        Verdict::Deliver {
            outcome: Outcome::Failed(Failure::Timeout { timeout_ms }),
            ..
        } => assert_eq!(timeout_ms, 50),
        other => panic!("expected timeout delivery, got {other:?}"),
    }
    assert_eq!(status.state(), RunState::CompletedFailure);
}

#[test]
fn success_exactly_at_the_deadline_still_passes() {
    init_tracing();

    let (mut gate, _status, t0) = started_gate(50);
    let verdict = gate.finalize(None, t0 + ms(50));
    assert!(matches!(verdict, Verdict::Deliver { outcome: Outcome::Passed, .. }));
}

#[test]
fn late_error_keeps_the_body_error() {
    init_tracing();

    let (mut gate, _status, t0) = started_gate(50);
    match gate.finalize(Some(Thrown::msg("slow and broken")), t0 + ms(80)) {
        Verdict::Deliver { outcome, .. } => {
            assert_eq!(
                outcome.failure().map(ToString::to_string).as_deref(),
                Some("slow and broken")
            );
        }
        other => panic!("expected delivery, got {other:?}"),
    }
}

#[test]
fn disabled_policy_never_synthesizes_a_timeout() {
    init_tracing();

    let status = StatusCell::new();
    let mut gate = FinalizeGate::new("gate", status, TimeoutPolicy::from_millis(50, false));
    let t0 = Instant::now();
    assert!(gate.begin(t0));
    assert_eq!(gate.deadline(), None);

    let verdict = gate.finalize(None, t0 + ms(10_000));
    assert!(matches!(verdict, Verdict::Deliver { outcome: Outcome::Passed, .. }));
}

#[test]
fn expiry_wins_and_later_signals_are_ignored() {
    init_tracing();

    let (mut gate, status, t0) = started_gate(50);
    assert_eq!(gate.deadline(), Some(t0 + ms(50)));

    let verdict = gate.expire(t0 + ms(50));
    assert!(matches!(
        verdict,
        Verdict::Deliver { outcome: Outcome::Failed(Failure::Timeout { timeout_ms: 50 }), .. }
    ));
    let snapshot = status.snapshot();

    assert!(matches!(gate.finalize(None, t0 + ms(200)), Verdict::Ignored));
    assert!(matches!(
        gate.finalize(Some(Thrown::msg("late")), t0 + ms(201)),
        Verdict::Ignored
    ));
    assert!(matches!(gate.expire(t0 + ms(300)), Verdict::Ignored));
    assert_eq!(status.snapshot(), snapshot);
}

#[test]
fn duplicate_after_completion_is_unexpected() {
    init_tracing();

    let (mut gate, status, t0) = started_gate(50);
    assert!(matches!(gate.finalize(None, t0 + ms(5)), Verdict::Deliver { .. }));

    match gate.finalize(Some(Thrown::msg("late")), t0 + ms(6)) {
        Verdict::Unexpected(failure) => {
            assert_eq!(
                failure.to_string(),
                "done() called multiple times in \"gate\" with error: late"
            );
        }
        other => panic!("expected unexpected completion, got {other:?}"),
    }

    // A timer that fires after completion changes nothing.
    assert!(matches!(gate.expire(t0 + ms(50)), Verdict::Ignored));
    assert_eq!(status.state(), RunState::CompletedSuccess);
    assert_eq!(status.snapshot().duration, Some(ms(5)));
}

#[test]
fn skip_settles_as_success_with_skipped_flag() {
    init_tracing();

    let (mut gate, status, t0) = started_gate(50);
    match gate.finalize(Some(Thrown::skip()), t0 + ms(1)) {
        Verdict::Deliver { outcome: Outcome::Skipped(pending), .. } => {
            assert_eq!(pending.message(), "sync skip; aborting execution");
        }
        other => panic!("expected skip delivery, got {other:?}"),
    }
    let snapshot = status.snapshot();
    assert_eq!(snapshot.state, RunState::CompletedSuccess);
    assert!(snapshot.skipped);
}

#[test]
fn reset_timeout_moves_the_deadline_but_not_the_duration() {
    init_tracing();

    let (mut gate, status, t0) = started_gate(50);
    gate.reset_timeout(100, t0 + ms(40));
    assert_eq!(gate.deadline(), Some(t0 + ms(140)));

    // 120ms after start, but only 80ms after the reset.
    assert!(matches!(
        gate.finalize(None, t0 + ms(120)),
        Verdict::Deliver { outcome: Outcome::Passed, .. }
    ));
    assert_eq!(status.snapshot().duration, Some(ms(120)));
}

#[test]
fn reset_to_zero_disarms_the_deadline() {
    init_tracing();

    let (mut gate, _status, t0) = started_gate(50);
    gate.reset_timeout(0, t0 + ms(10));
    assert_eq!(gate.deadline(), None);
    assert!(matches!(
        gate.finalize(None, t0 + ms(5_000)),
        Verdict::Deliver { outcome: Outcome::Passed, .. }
    ));
}

#[test]
fn policy_clamps_and_recognizes_sentinels() {
    let negative = TimeoutPolicy::from_millis(-5, true);
    assert_eq!(negative.timeout_ms, 0);
    assert!(!negative.enabled);

    let huge = TimeoutPolicy::from_millis(i64::MAX, true);
    assert_eq!(huge.timeout_ms, i32::MAX as u64);
    assert!(!huge.enabled);

    let normal = TimeoutPolicy::from_millis(2_000, true);
    assert_eq!(normal.timeout_ms, 2_000);
    assert!(normal.enabled);
}
