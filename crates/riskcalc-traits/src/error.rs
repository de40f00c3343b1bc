//! Error types for collaborator operations.

use thiserror::Error;

/// Common error type for collaborator operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TraitError {
    /// Connection to external service failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Requested resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// No rate is available for the currency pair
    #[error("no exchange rate for {from}/{to}")]
    RateUnavailable {
        /// Source currency
        from: String,
        /// Target currency
        to: String,
    },

    /// Operation timed out
    #[error("timeout")]
    Timeout,

    /// Parse/deserialization error
    #[error("parse error: {0}")]
    ParseError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl TraitError {
    /// True for failures worth retrying (network and I/O hiccups).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TraitError::ConnectionFailed(_) | TraitError::Timeout | TraitError::IoError(_)
        )
    }
}

impl From<std::io::Error> for TraitError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => TraitError::NotFound(e.to_string()),
            std::io::ErrorKind::TimedOut => TraitError::Timeout,
            _ => TraitError::IoError(e.to_string()),
        }
    }
}
