//! Core error types for Tally.
//!
//! All errors are explicit and typed. Validation failures are raised before a
//! request ever reaches the coordinator and are never retried.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A caller-supplied request was malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("identity must not be empty")]
    EmptyIdentity,

    #[error("identity '{identity}' is not a valid email address")]
    MalformedIdentity { identity: String },

    #[error("amount '{input}' is not a decimal number")]
    InvalidAmount { input: String },

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("amount '{input}' has more than two decimal places")]
    TooManyDecimals { input: String },
}

/// Core error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to read config file '{path}': {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    #[error("failed to parse config: {reason}")]
    ConfigParse { reason: String },
}

impl Error {
    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a config read error.
    pub fn config_read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a config parse error.
    pub fn config_parse(reason: impl Into<String>) -> Self {
        Self::ConfigParse {
            reason: reason.into(),
        }
    }
}
