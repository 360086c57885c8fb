// src/runnable/settings.rs

//! Per-runnable execution settings and their setter rules.

use crate::engine::{TimeoutPolicy, is_disabling_timeout};
use crate::errors::{HookrunError, Result};

pub const DEFAULT_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_SLOW_MS: u64 = 75;

/// `retries` value meaning "not configured".
pub const RETRIES_UNSET: i64 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    timeout_ms: u64,
    slow_ms: u64,
    timeouts_enabled: bool,
    retries: i64,
    current_retry: u32,
    globals: Option<Vec<String>>,
    allow_uncaught: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            slow_ms: DEFAULT_SLOW_MS,
            timeouts_enabled: true,
            retries: RETRIES_UNSET,
            current_retry: 0,
            globals: None,
            allow_uncaught: false,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> u64 {
        self.timeout_ms
    }

    /// Clamp to `[0, i32::MAX]`. `0` and `i32::MAX` switch enforcement off;
    /// any other value leaves `timeouts_enabled` untouched.
    pub fn set_timeout(&mut self, timeout_ms: i64) {
        let policy = TimeoutPolicy::from_millis(timeout_ms, true);
        self.timeout_ms = policy.timeout_ms;
        if is_disabling_timeout(self.timeout_ms) {
            self.timeouts_enabled = false;
        }
    }

    /// Like [`Settings::set_timeout`], from `"2s"`, `"250ms"` or bare millis.
    pub fn set_timeout_str(&mut self, s: &str) -> Result<()> {
        let ms = parse_millis(s).map_err(|reason| HookrunError::invalid_argument("timeout", reason))?;
        self.set_timeout(ms.min(i64::MAX as u64) as i64);
        Ok(())
    }

    pub fn slow(&self) -> u64 {
        self.slow_ms
    }

    pub fn set_slow(&mut self, slow_ms: u64) {
        self.slow_ms = slow_ms;
    }

    pub fn set_slow_str(&mut self, s: &str) -> Result<()> {
        self.slow_ms = parse_millis(s).map_err(|reason| HookrunError::invalid_argument("slow", reason))?;
        Ok(())
    }

    pub fn timeouts_enabled(&self) -> bool {
        self.timeouts_enabled
    }

    pub fn enable_timeouts(&mut self, enabled: bool) {
        self.timeouts_enabled = enabled;
    }

    pub fn retries(&self) -> i64 {
        self.retries
    }

    pub fn set_retries(&mut self, retries: i64) {
        self.retries = retries;
    }

    pub fn current_retry(&self) -> u32 {
        self.current_retry
    }

    pub fn set_current_retry(&mut self, current_retry: u32) {
        self.current_retry = current_retry;
    }

    pub fn globals(&self) -> Option<&[String]> {
        self.globals.as_deref()
    }

    pub fn set_globals(&mut self, globals: Vec<String>) {
        self.globals = Some(globals);
    }

    pub fn allow_uncaught(&self) -> bool {
        self.allow_uncaught
    }

    pub fn set_allow_uncaught(&mut self, allow: bool) {
        self.allow_uncaught = allow;
    }

    /// Deadline policy as captured at run start.
    pub fn policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::from_millis(self.timeout_ms as i64, self.timeouts_enabled)
    }
}

/// Parse a duration like `"3s"`, `"250ms"`, `"1m"`, `"2h"` or a bare
/// number of milliseconds into milliseconds.
pub fn parse_millis(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num_part, unit_part) = s.split_at(idx);
    if num_part.is_empty() {
        return Err(format!("duration '{s}' does not start with a number"));
    }

    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let factor: u64 = match unit.as_str() {
        "" | "ms" => 1,
        "s" => 1000,
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(factor)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
