// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::Value;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [defaults]
/// timeout = "2s"
/// slow = "75ms"
/// retries = 1
///
/// [suite]
/// title = "smoke"
///
/// [test.build]
/// title = "builds the project"
/// cmd = "make"
/// timeout = 0
/// ```
///
/// All sections are optional except that at least one test must exist.
/// This raw form is not validated; see [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub suite: SuiteSection,

    /// All tests from `[test.<key>]`, in key order.
    #[serde(default)]
    pub test: BTreeMap<String, TestConfig>,
}

/// A duration as written in config: integer milliseconds or a string such
/// as `"2s"` / `"250ms"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DurationSetting {
    Millis(i64),
    Text(String),
}

/// `[defaults]` section, applied to every test that does not override it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    #[serde(default)]
    pub timeout: Option<DurationSetting>,

    #[serde(default)]
    pub slow: Option<DurationSetting>,

    /// `-1` (the default) means "not configured", i.e. no retries.
    #[serde(default)]
    pub retries: Option<i64>,

    #[serde(default)]
    pub enable_timeouts: Option<bool>,

    #[serde(default)]
    pub allow_uncaught: bool,
}

/// `[suite]` section: the parent every test hangs off.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteSection {
    #[serde(default)]
    pub title: Option<String>,

    /// Marks every test as pending.
    #[serde(default)]
    pub pending: bool,
}

/// `[test.<key>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Display title; defaults to the table key. Must be a string.
    #[serde(default)]
    pub title: Option<Value>,

    /// Shell command. A test without a command is pending.
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub timeout: Option<DurationSetting>,

    #[serde(default)]
    pub slow: Option<DurationSetting>,

    #[serde(default)]
    pub retries: Option<i64>,

    #[serde(default)]
    pub enable_timeouts: Option<bool>,

    #[serde(default)]
    pub allow_uncaught: Option<bool>,

    #[serde(default)]
    pub globals: Option<Vec<String>>,
}

/// Validated configuration, with defaults resolved into every test.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub suite: SuiteSection,
    pub tests: Vec<TestSpec>,
}

/// One fully resolved test definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    /// The `[test.<key>]` key.
    pub key: String,
    pub title: String,
    pub cmd: Option<String>,
    pub timeout_ms: i64,
    pub slow_ms: u64,
    pub retries: i64,
    pub enable_timeouts: bool,
    pub allow_uncaught: bool,
    pub globals: Option<Vec<String>>,
}

impl ConfigFile {
    pub fn find(&self, key: &str) -> Option<&TestSpec> {
        self.tests.iter().find(|t| t.key == key)
    }
}
