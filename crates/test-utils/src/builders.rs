#![allow(dead_code)]

use std::collections::BTreeMap;

use hookrun::config::{
    ConfigFile, DefaultsSection, DurationSetting, RawConfigFile, SuiteSection, TestConfig,
};
use hookrun::types::Value;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                defaults: DefaultsSection::default(),
                suite: SuiteSection::default(),
                test: BTreeMap::new(),
            },
        }
    }

    pub fn with_test(mut self, key: &str, test: TestConfig) -> Self {
        self.config.test.insert(key.to_string(), test);
        self
    }

    pub fn with_suite_title(mut self, title: &str) -> Self {
        self.config.suite.title = Some(title.to_string());
        self
    }

    pub fn with_pending_suite(mut self) -> Self {
        self.config.suite.pending = true;
        self
    }

    pub fn with_default_timeout(mut self, timeout: DurationSetting) -> Self {
        self.config.defaults.timeout = Some(timeout);
        self
    }

    pub fn with_default_slow(mut self, slow: DurationSetting) -> Self {
        self.config.defaults.slow = Some(slow);
        self
    }

    pub fn with_default_retries(mut self, retries: i64) -> Self {
        self.config.defaults.retries = Some(retries);
        self
    }

    pub fn with_default_enable_timeouts(mut self, val: bool) -> Self {
        self.config.defaults.enable_timeouts = Some(val);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TestConfig`.
pub struct TestConfigBuilder {
    test: TestConfig,
}

impl TestConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            test: TestConfig {
                cmd: Some(cmd.to_string()),
                ..TestConfig::default()
            },
        }
    }

    /// A test without a command, i.e. a pending one.
    pub fn pending() -> Self {
        Self {
            test: TestConfig::default(),
        }
    }

    pub fn title(mut self, title: impl Into<Value>) -> Self {
        self.test.title = Some(title.into());
        self
    }

    pub fn timeout_ms(mut self, ms: i64) -> Self {
        self.test.timeout = Some(DurationSetting::Millis(ms));
        self
    }

    pub fn timeout(mut self, text: &str) -> Self {
        self.test.timeout = Some(DurationSetting::Text(text.to_string()));
        self
    }

    pub fn slow(mut self, text: &str) -> Self {
        self.test.slow = Some(DurationSetting::Text(text.to_string()));
        self
    }

    pub fn retries(mut self, retries: i64) -> Self {
        self.test.retries = Some(retries);
        self
    }

    pub fn enable_timeouts(mut self, val: bool) -> Self {
        self.test.enable_timeouts = Some(val);
        self
    }

    pub fn allow_uncaught(mut self, val: bool) -> Self {
        self.test.allow_uncaught = Some(val);
        self
    }

    pub fn globals(mut self, globals: &[&str]) -> Self {
        self.test.globals = Some(globals.iter().map(|g| g.to_string()).collect());
        self
    }

    pub fn build(self) -> TestConfig {
        self.test
    }
}
