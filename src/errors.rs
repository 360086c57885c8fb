// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! These cover configuration and construction-time contracts. Failures of a
//! running body never show up here; they are normalized into
//! [`crate::engine::Failure`] and delivered through the completion callback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// An argument had the wrong runtime type (e.g. a numeric title).
    #[error("argument \"{argument}\" should be a {expected}, received type \"{actual}\"")]
    InvalidArgumentType {
        argument: String,
        expected: String,
        actual: String,
    },

    /// An argument had the right type but an unusable value.
    #[error("invalid argument \"{argument}\": {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookrunError {
    pub fn invalid_type(argument: &str, expected: &str, actual: &str) -> Self {
        HookrunError::InvalidArgumentType {
            argument: argument.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn invalid_argument(argument: &str, reason: impl Into<String>) -> Self {
        HookrunError::InvalidArgument {
            argument: argument.to_string(),
            reason: reason.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HookrunError>;
