//! Error types for the endpoint crate.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A transient fault raised by the endpoint instead of returning an outcome.
///
/// Always retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("endpoint fault: {message}")]
pub struct EndpointFault {
    pub message: String,
}

impl EndpointFault {
    /// Create a fault carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Idempotency store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Only successful outcomes may be cached.
    #[error("record for key '{key}' is not cacheable: status is {status}")]
    NotCacheable { key: String, status: String },
}

impl StoreError {
    /// Create a not-cacheable error.
    pub fn not_cacheable(key: impl Into<String>, status: impl Into<String>) -> Self {
        Self::NotCacheable {
            key: key.into(),
            status: status.into(),
        }
    }
}

impl From<StoreError> for EndpointFault {
    fn from(err: StoreError) -> Self {
        Self::new(err.to_string())
    }
}
