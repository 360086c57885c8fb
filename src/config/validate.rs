// src/config/validate.rs

use crate::config::model::{ConfigFile, DurationSetting, RawConfigFile, TestConfig, TestSpec};
use crate::errors::{HookrunError, Result};
use crate::runnable::{DEFAULT_SLOW_MS, DEFAULT_TIMEOUT_MS, RETRIES_UNSET, parse_millis};
use crate::types::Value;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = HookrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tests(&raw)?;
        let defaults = Defaults::resolve(&raw)?;

        let mut tests = Vec::with_capacity(raw.test.len());
        for (key, cfg) in raw.test.iter() {
            tests.push(resolve_test(key, cfg, &defaults)?);
        }

        Ok(ConfigFile {
            suite: raw.suite,
            tests,
        })
    }
}

/// Validate a raw config without keeping the result.
pub fn validate_config(raw: &RawConfigFile) -> Result<()> {
    ConfigFile::try_from(raw.clone()).map(|_| ())
}

struct Defaults {
    timeout_ms: i64,
    slow_ms: u64,
    retries: i64,
    enable_timeouts: bool,
    allow_uncaught: bool,
}

impl Defaults {
    fn resolve(raw: &RawConfigFile) -> Result<Self> {
        let d = &raw.defaults;
        let retries = d.retries.unwrap_or(RETRIES_UNSET);
        check_retries("[defaults]", retries)?;

        Ok(Self {
            timeout_ms: match &d.timeout {
                Some(t) => duration_ms("timeout", t)?,
                None => DEFAULT_TIMEOUT_MS as i64,
            },
            slow_ms: match &d.slow {
                Some(s) => duration_ms("slow", s)?.max(0) as u64,
                None => DEFAULT_SLOW_MS,
            },
            retries,
            enable_timeouts: d.enable_timeouts.unwrap_or(true),
            allow_uncaught: d.allow_uncaught,
        })
    }
}

fn ensure_has_tests(cfg: &RawConfigFile) -> Result<()> {
    if cfg.test.is_empty() {
        return Err(HookrunError::ConfigError(
            "config must contain at least one [test.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn resolve_test(key: &str, cfg: &TestConfig, defaults: &Defaults) -> Result<TestSpec> {
    let title = match &cfg.title {
        None => key.to_string(),
        Some(Value::String(title)) => title.clone(),
        Some(other) => {
            return Err(HookrunError::invalid_type("title", "string", other.type_tag()));
        }
    };

    if let Some(cmd) = &cfg.cmd {
        if cmd.trim().is_empty() {
            return Err(HookrunError::ConfigError(format!(
                "test '{key}' has an empty `cmd`; omit it to mark the test pending"
            )));
        }
    }

    let retries = cfg.retries.unwrap_or(defaults.retries);
    check_retries(&format!("test '{key}'"), retries)?;

    Ok(TestSpec {
        key: key.to_string(),
        title,
        cmd: cfg.cmd.clone(),
        timeout_ms: match &cfg.timeout {
            Some(t) => duration_ms("timeout", t)?,
            None => defaults.timeout_ms,
        },
        slow_ms: match &cfg.slow {
            Some(s) => duration_ms("slow", s)?.max(0) as u64,
            None => defaults.slow_ms,
        },
        retries,
        enable_timeouts: cfg.enable_timeouts.unwrap_or(defaults.enable_timeouts),
        allow_uncaught: cfg.allow_uncaught.unwrap_or(defaults.allow_uncaught),
        globals: cfg.globals.clone(),
    })
}

fn check_retries(location: &str, retries: i64) -> Result<()> {
    if retries < RETRIES_UNSET {
        return Err(HookrunError::ConfigError(format!(
            "{location}: retries must be >= -1 (got {retries})"
        )));
    }
    Ok(())
}

fn duration_ms(argument: &str, setting: &DurationSetting) -> Result<i64> {
    match setting {
        DurationSetting::Millis(ms) => Ok(*ms),
        DurationSetting::Text(s) => {
            let ms = parse_millis(s).map_err(|reason| HookrunError::invalid_argument(argument, reason))?;
            Ok(ms.min(i64::MAX as u64) as i64)
        }
    }
}
