//! Error types for exposure analytics.
//!
//! This module defines the error types used throughout the portfolio crate.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::analysis::ProcessingState;

/// Result type for portfolio operations.
pub type PortfolioResult<T> = Result<T, PortfolioError>;

/// Errors that can occur during exposure analytics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    /// Gross exposure below zero passed to the netter.
    #[error("Negative gross exposure for '{exposure_id}': {amount}")]
    NegativeGrossExposure {
        /// The exposure ID.
        exposure_id: String,
        /// The rejected amount.
        amount: Decimal,
    },

    /// Converted mitigation value below zero.
    #[error("Negative mitigation value for '{exposure_id}': {amount}")]
    NegativeMitigation {
        /// The exposure ID.
        exposure_id: String,
        /// The rejected amount.
        amount: Decimal,
    },

    /// No usable rate was resolved for a currency.
    #[error("No exchange rate for {currency}: {reason}")]
    RateUnavailable {
        /// The currency code.
        currency: String,
        /// Why the rate is missing.
        reason: String,
    },

    /// Conversion failure under the fail-fast policy.
    #[error("Currency conversion failed for '{exposure_id}' ({currency}): {reason}")]
    ConversionFailed {
        /// The exposure ID.
        exposure_id: String,
        /// The currency code.
        currency: String,
        /// The underlying rate failure.
        reason: String,
    },

    /// Concentration thresholds are not ordered or out of range.
    #[error("Invalid concentration thresholds: {reason}")]
    InvalidThresholds {
        /// The reason the thresholds are invalid.
        reason: String,
    },

    /// A lifecycle transition not allowed from the current state.
    #[error("Batch '{batch_id}' cannot {action} while {state}")]
    InvalidStateTransition {
        /// The batch ID.
        batch_id: String,
        /// Current state.
        state: ProcessingState,
        /// The attempted action.
        action: String,
    },

    /// Progress update beyond the announced total.
    #[error("Processed exposures {processed} exceed total {total}")]
    ProgressExceedsTotal {
        /// Reported processed count.
        processed: usize,
        /// Announced total.
        total: usize,
    },
}

impl PortfolioError {
    /// Create a rate unavailable error.
    #[must_use]
    pub fn rate_unavailable(currency: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RateUnavailable {
            currency: currency.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid thresholds error.
    #[must_use]
    pub fn invalid_thresholds(reason: impl Into<String>) -> Self {
        Self::InvalidThresholds {
            reason: reason.into(),
        }
    }

    /// Create an invalid state transition error.
    #[must_use]
    pub fn invalid_transition(
        batch_id: impl Into<String>,
        state: ProcessingState,
        action: impl Into<String>,
    ) -> Self {
        Self::InvalidStateTransition {
            batch_id: batch_id.into(),
            state,
            action: action.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = PortfolioError::NegativeGrossExposure {
            exposure_id: "E1".into(),
            amount: dec!(-10),
        };
        assert!(err.to_string().contains("E1"));
        assert!(err.to_string().contains("-10"));
    }

    #[test]
    fn test_transition_display() {
        let err = PortfolioError::invalid_transition("B1", ProcessingState::Completed, "start");
        assert_eq!(err.to_string(), "Batch 'B1' cannot start while COMPLETED");
    }
}
