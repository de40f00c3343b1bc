//! Error types for the core domain types.

use rust_decimal::Decimal;
use thiserror::Error;

/// A specialized Result type for core type construction.
pub type CoreResult<T> = Result<T, CoreError>;

/// Validation failures raised by the smart constructors in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A required field was absent or blank.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// Currency code is not a three-letter ISO 4217 code.
    #[error("Invalid currency code '{code}': {reason}")]
    InvalidCurrency {
        /// The rejected code.
        code: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Amount violates a precondition (negative where not allowed).
    #[error("Invalid amount for {field}: {value} - {reason}")]
    InvalidAmount {
        /// Field the amount belongs to.
        field: String,
        /// The rejected amount.
        value: Decimal,
        /// Why it was rejected.
        reason: String,
    },

    /// Exchange rate is not strictly positive.
    #[error("Invalid exchange rate {from}/{to}: {rate}")]
    InvalidRate {
        /// Source currency.
        from: String,
        /// Target currency.
        to: String,
        /// The rejected rate.
        rate: Decimal,
    },

    /// Unrecognized enumeration value.
    #[error("Unknown {kind}: '{value}'")]
    UnknownVariant {
        /// What was being parsed (e.g. "mitigation type").
        kind: String,
        /// The unrecognized text.
        value: String,
    },
}

impl CoreError {
    /// Creates a missing field error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid currency error.
    #[must_use]
    pub fn invalid_currency(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCurrency {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid amount error.
    #[must_use]
    pub fn invalid_amount(field: impl Into<String>, value: Decimal, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            field: field.into(),
            value,
            reason: reason.into(),
        }
    }

    /// Creates an unknown variant error.
    #[must_use]
    pub fn unknown_variant(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind: kind.into(),
            value: value.into(),
        }
    }
}
