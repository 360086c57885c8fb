// src/engine/core.rs

//! Pure finalize gate.
//!
//! Every completion signal for one run passes through [`FinalizeGate`]:
//! the body's completion callback, an error raised while invoking the body,
//! and the deadline timer. The gate decides, against the shared
//! [`StatusCell`], whether the signal settles the run, is a duplicate, or is
//! stale.
//!
//! The gate does no IO and never reads the clock itself; callers pass `now`.
//! The async shell (`engine::runtime::Driver`) owns timers and channels.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::error::{Failure, Outcome, Thrown};
use super::state::{RunState, StatusCell};

/// Largest accepted timeout; also the "never time out" sentinel.
pub const MAX_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Deadline configuration captured when a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub timeout_ms: u64,
    pub enabled: bool,
}

impl TimeoutPolicy {
    /// Clamp `timeout_ms` to `[0, MAX_TIMEOUT_MS]`; both ends disable the
    /// deadline.
    pub fn from_millis(timeout_ms: i64, enabled: bool) -> Self {
        let timeout_ms = timeout_ms.clamp(0, MAX_TIMEOUT_MS as i64) as u64;
        let enabled = enabled && !is_disabling_timeout(timeout_ms);
        Self {
            timeout_ms,
            enabled,
        }
    }

    /// Deadline relative to `start`, or `None` when no timer should be armed.
    pub fn deadline(&self, start: Instant) -> Option<Instant> {
        if self.enabled && self.timeout_ms > 0 {
            Some(start + Duration::from_millis(self.timeout_ms))
        } else {
            None
        }
    }

    fn exceeded_by(&self, elapsed: Duration) -> bool {
        self.enabled && elapsed > Duration::from_millis(self.timeout_ms)
    }
}

/// `0` and [`MAX_TIMEOUT_MS`] mean "no deadline", not a literal duration.
pub fn is_disabling_timeout(timeout_ms: u64) -> bool {
    timeout_ms == 0 || timeout_ms >= MAX_TIMEOUT_MS
}

/// What the gate decided about one signal.
#[derive(Debug)]
pub enum Verdict {
    /// First arrival: deliver this outcome through the primary channel.
    Deliver { outcome: Outcome, duration: Duration },
    /// The unit already completed; report this on the secondary channel.
    Unexpected(Failure),
    /// The unit already timed out; drop the signal.
    Ignored,
}

/// Arbitration point for one run.
#[derive(Debug)]
pub struct FinalizeGate {
    title: String,
    status: StatusCell,
    policy: TimeoutPolicy,
    started: Option<Instant>,
    /// Where the deadline counts from; moves on `reset_timeout`.
    deadline_base: Option<Instant>,
}

impl FinalizeGate {
    pub fn new(title: impl Into<String>, status: StatusCell, policy: TimeoutPolicy) -> Self {
        Self {
            title: title.into(),
            status,
            policy,
            started: None,
            deadline_base: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    pub fn started(&self) -> Option<Instant> {
        self.started
    }

    /// `Idle -> Running`. Returns `false` if the cell was not idle.
    pub fn begin(&mut self, now: Instant) -> bool {
        let began = self.status.transition(|status| {
            if status.state != RunState::Idle {
                return false;
            }
            status.state = RunState::Running;
            true
        });
        if began {
            self.started = Some(now);
            self.deadline_base = Some(now);
        }
        began
    }

    /// Deadline for the current policy, measured from the run start (or the
    /// latest reset).
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline_base.and_then(|base| self.policy.deadline(base))
    }

    /// Replace the timeout while running.
    ///
    /// The new deadline counts from `now`, not from the original start, and
    /// the elapsed-time check at completion is rebased the same way. The
    /// recorded duration still counts from the start.
    pub fn reset_timeout(&mut self, timeout_ms: i64, now: Instant) {
        self.policy = TimeoutPolicy::from_millis(timeout_ms, self.policy.enabled);
        if self.status.state() == RunState::Running {
            self.deadline_base = Some(now);
        }
    }

    /// Route a completion signal (from the body) through the gate.
    pub fn finalize(&mut self, signal: Option<Thrown>, now: Instant) -> Verdict {
        let elapsed = self.elapsed(now);
        let since_deadline_base = self.since_deadline_base(now);
        let policy = self.policy;
        let title = &self.title;

        let mut signal = Some(signal);
        let mut verdict = Verdict::Ignored;

        self.status.transition(|status| match status.state {
            RunState::TimedOut => false,
            RunState::CompletedSuccess | RunState::CompletedFailure => {
                let extra = signal.take().flatten();
                verdict = Verdict::Unexpected(Failure::multiple_completion(title.clone(), extra));
                false
            }
            RunState::Idle | RunState::Running => {
                let payload = signal.take().flatten();
                let outcome = match payload {
                    None if policy.exceeded_by(since_deadline_base) => {
                        Outcome::Failed(Failure::Timeout {
                            timeout_ms: policy.timeout_ms,
                        })
                    }
                    payload => Outcome::from_signal(payload),
                };
                status.state = if outcome.is_failed() {
                    RunState::CompletedFailure
                } else {
                    RunState::CompletedSuccess
                };
                status.skipped = outcome.is_skipped();
                status.duration = Some(elapsed);
                verdict = Verdict::Deliver {
                    outcome,
                    duration: elapsed,
                };
                true
            }
        });

        debug!(test = %self.title, verdict = verdict_name(&verdict), "completion signal finalized");
        verdict
    }

    /// Route a deadline expiry through the gate.
    pub fn expire(&mut self, now: Instant) -> Verdict {
        let elapsed = self.elapsed(now);
        let timeout_ms = self.policy.timeout_ms;
        let mut verdict = Verdict::Ignored;

        self.status.transition(|status| {
            if status.state.is_terminal() {
                return false;
            }
            status.state = RunState::TimedOut;
            status.duration = Some(elapsed);
            verdict = Verdict::Deliver {
                outcome: Outcome::Failed(Failure::Timeout { timeout_ms }),
                duration: elapsed,
            };
            true
        });

        debug!(test = %self.title, verdict = verdict_name(&verdict), "deadline finalized");
        verdict
    }

    fn elapsed(&self, now: Instant) -> Duration {
        match self.started {
            Some(start) => now.saturating_duration_since(start),
            None => Duration::ZERO,
        }
    }

    fn since_deadline_base(&self, now: Instant) -> Duration {
        match self.deadline_base {
            Some(base) => now.saturating_duration_since(base),
            None => Duration::ZERO,
        }
    }
}

fn verdict_name(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Deliver { .. } => "deliver",
        Verdict::Unexpected(_) => "unexpected",
        Verdict::Ignored => "ignored",
    }
}
