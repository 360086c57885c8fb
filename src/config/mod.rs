// src/config/mod.rs

//! Configuration loading and validation for the command harness.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and resolve defaults into per-test specs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigFile, DefaultsSection, DurationSetting, RawConfigFile, SuiteSection, TestConfig, TestSpec,
};
pub use validate::validate_config;
