//! Error types for the submission coordinator.

use thiserror::Error;

/// Result type alias for coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coordinator error types.
///
/// Only [`Error::AlreadyInProgress`] is ever returned from `submit`. The rest
/// are absorbed by the retry loop and surface as snapshot details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The same identity + amount pair is already being submitted.
    #[error("submission '{token}' is already in progress")]
    AlreadyInProgress { token: String },

    /// The endpoint returned a temporary failure or raised a fault.
    #[error("{message}")]
    TransientEndpointFailure { message: String },

    /// The retry budget ran out.
    #[error("failed after {retries} retries: {last_failure}")]
    RetriesExhausted { retries: u32, last_failure: String },

    /// The endpoint rejected the submission outright.
    #[error("rejected by endpoint: {message}")]
    Rejected { message: String },

    /// The submission task ended without reaching a terminal state.
    #[error("submission interrupted: {reason}")]
    Interrupted { reason: String },
}

impl Error {
    /// Create an already-in-progress error.
    pub fn already_in_progress(token: impl Into<String>) -> Self {
        Self::AlreadyInProgress {
            token: token.into(),
        }
    }

    /// Create a transient endpoint failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientEndpointFailure {
            message: message.into(),
        }
    }

    /// Create a retries-exhausted error.
    pub fn retries_exhausted(retries: u32, last_failure: impl Into<String>) -> Self {
        Self::RetriesExhausted {
            retries,
            last_failure: last_failure.into(),
        }
    }

    /// Create a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create an interrupted error.
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// Check if the retry loop may try again after this error.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientEndpointFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::retries_exhausted(3, "service temporarily unavailable (503)");
        assert_eq!(
            err.to_string(),
            "failed after 3 retries: service temporarily unavailable (503)"
        );
        assert!(
            Error::already_in_progress("a@x.com:50.00")
                .to_string()
                .contains("a@x.com:50.00")
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::transient("503").is_retryable());
        assert!(!Error::rejected("blocked").is_retryable());
        assert!(!Error::retries_exhausted(3, "503").is_retryable());
        assert!(!Error::already_in_progress("t").is_retryable());
        assert!(!Error::interrupted("panicked").is_retryable());
    }
}
