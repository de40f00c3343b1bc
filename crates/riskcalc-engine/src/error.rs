//! Engine error types.

use std::fmt;

use riskcalc_core::BatchId;
use riskcalc_portfolio::PortfolioError;
use riskcalc_traits::TraitError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine result type.
pub type EngineResult<T> = Result<T, EngineError>;

/// Stable code recorded on a failed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The source file could not be downloaded.
    FileDownloadError,
    /// The source file is structurally invalid.
    FileParsingError,
    /// The result document could not be stored.
    ResultStorageError,
    /// A rate was missing under the fail-fast policy.
    CurrencyConversionError,
    /// Any other calculation failure.
    CalculationFailed,
    /// The batch job was cancelled.
    BatchCancelled,
    /// The batch id is already registered.
    DuplicateBatch,
    /// A lifecycle transition was rejected.
    InvalidStateTransition,
}

impl ErrorCode {
    /// The code as written into `errorMessage`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FileDownloadError => "FILE_DOWNLOAD_ERROR",
            ErrorCode::FileParsingError => "FILE_PARSING_ERROR",
            ErrorCode::ResultStorageError => "RESULT_STORAGE_ERROR",
            ErrorCode::CurrencyConversionError => "CURRENCY_CONVERSION_ERROR",
            ErrorCode::CalculationFailed => "CALCULATION_FAILED",
            ErrorCode::BatchCancelled => "BATCH_CANCELLED",
            ErrorCode::DuplicateBatch => "DUPLICATE_BATCH",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Download retries exhausted or a permanent download failure
    #[error("failed to download '{uri}' after {attempts} attempt(s): {source}")]
    DownloadFailed {
        /// Source URI.
        uri: String,
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        #[source]
        source: TraitError,
    },

    /// The source file is not a valid exposure document
    #[error("invalid exposure file: {0}")]
    ParseError(String),

    /// Storing the result document failed
    #[error("failed to store results for batch '{batch_id}' after {attempts} attempt(s): {source}")]
    StorageFailed {
        /// Batch whose results were lost.
        batch_id: BatchId,
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        #[source]
        source: TraitError,
    },

    /// Calculation core error
    #[error(transparent)]
    Calculation(#[from] PortfolioError),

    /// The batch job was cancelled
    #[error("batch '{0}' was cancelled")]
    Cancelled(BatchId),

    /// The batch id is already registered
    #[error("batch '{0}' is already registered")]
    DuplicateBatch(BatchId),

    /// Engine is shutting down
    #[error("engine is shutting down")]
    Shutdown,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::DownloadFailed { .. } => ErrorCode::FileDownloadError,
            EngineError::ParseError(_) => ErrorCode::FileParsingError,
            EngineError::StorageFailed { .. } => ErrorCode::ResultStorageError,
            EngineError::Calculation(PortfolioError::ConversionFailed { .. })
            | EngineError::Calculation(PortfolioError::RateUnavailable { .. }) => {
                ErrorCode::CurrencyConversionError
            }
            EngineError::Calculation(PortfolioError::InvalidStateTransition { .. }) => {
                ErrorCode::InvalidStateTransition
            }
            EngineError::Cancelled(_) | EngineError::Shutdown => ErrorCode::BatchCancelled,
            EngineError::DuplicateBatch(_) => ErrorCode::DuplicateBatch,
            EngineError::ConfigError(_)
            | EngineError::Calculation(_)
            | EngineError::Internal(_) => ErrorCode::CalculationFailed,
        }
    }
}

impl From<riskcalc_config::ConfigError> for EngineError {
    fn from(e: riskcalc_config::ConfigError) -> Self {
        EngineError::ConfigError(e.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(e: tokio::task::JoinError) -> Self {
        EngineError::Internal(format!("worker task failed: {e}"))
    }
}
