//! EUR valuation of source-currency amounts.
//!
//! Rates are resolved once per batch (asynchronously, by the engine) into a
//! [`RateSnapshot`]; everything here is then a synchronous lookup so the
//! per-exposure pipeline can run on the rayon pool.

use std::collections::HashMap;

use riskcalc_core::{round_half_up, CurrencyCode, EurAmount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, PortfolioResult};

// =============================================================================
// RATE SNAPSHOT
// =============================================================================

/// Rates into EUR resolved for one batch, including the failed lookups.
#[derive(Debug, Clone, Default)]
pub struct RateSnapshot {
    rates: HashMap<CurrencyCode, Result<Decimal, String>>,
}

impl RateSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rate (builder style).
    #[must_use]
    pub fn with_rate(mut self, currency: CurrencyCode, rate: Decimal) -> Self {
        self.insert_rate(currency, rate);
        self
    }

    /// Records a successful lookup.
    pub fn insert_rate(&mut self, currency: CurrencyCode, rate: Decimal) {
        self.rates.insert(currency, Ok(rate));
    }

    /// Records a failed lookup so later conversions report the same reason.
    pub fn insert_failure(&mut self, currency: CurrencyCode, reason: impl Into<String>) {
        self.rates.insert(currency, Err(reason.into()));
    }

    /// Rate from `currency` into EUR. EUR itself is always 1.
    pub fn rate(&self, currency: &CurrencyCode) -> PortfolioResult<Decimal> {
        if currency.is_eur() {
            return Ok(Decimal::ONE);
        }
        match self.rates.get(currency) {
            Some(Ok(rate)) => Ok(*rate),
            Some(Err(reason)) => Err(PortfolioError::rate_unavailable(currency.as_str(), reason)),
            None => Err(PortfolioError::rate_unavailable(
                currency.as_str(),
                "rate was not resolved for this batch",
            )),
        }
    }

    /// Number of currencies looked up, successful or not.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// True when no currency has been looked up.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Currencies whose lookup failed.
    pub fn failed_currencies(&self) -> Vec<&CurrencyCode> {
        let mut failed: Vec<_> = self
            .rates
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(c, _)| c)
            .collect();
        failed.sort();
        failed
    }
}

// =============================================================================
// CONVERSION
// =============================================================================

/// Multiplies by `rate` and rounds half-up to the EUR minor unit.
#[must_use]
pub fn apply_rate(amount: Decimal, rate: Decimal) -> EurAmount {
    let eur = CurrencyCode::eur();
    EurAmount::new(round_half_up(amount * rate, eur.minor_units()))
}

/// Converts `amount` in `from` into EUR.
///
/// EUR amounts pass through unchanged, scale included.
pub fn convert_to_eur(
    amount: Decimal,
    from: &CurrencyCode,
    rates: &RateSnapshot,
) -> PortfolioResult<EurAmount> {
    if from.is_eur() {
        return Ok(EurAmount::new(amount));
    }
    let rate = rates.rate(from)?;
    Ok(apply_rate(amount, rate))
}

// =============================================================================
// FAILURE POLICY
// =============================================================================

/// What to do with an exposure whose currency cannot be converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionFailurePolicy {
    /// Keep the exposure at EUR zero and flag it.
    #[default]
    ZeroFallback,
    /// Drop the exposure from the batch and report it as skipped.
    SkipRecord,
    /// Fail the whole batch.
    FailFast,
}

/// Result of converting one amount under a [`ConversionFailurePolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Rate found and applied.
    Converted(EurAmount),
    /// Rate missing; amount replaced by EUR zero.
    ZeroFallback {
        /// The rate failure.
        reason: String,
    },
    /// Rate missing; the owning record should be dropped.
    Skipped {
        /// The rate failure.
        reason: String,
    },
}

impl ConversionOutcome {
    /// The EUR amount to use, if the record is kept.
    pub fn amount(&self) -> Option<EurAmount> {
        match self {
            ConversionOutcome::Converted(amount) => Some(*amount),
            ConversionOutcome::ZeroFallback { .. } => Some(EurAmount::zero()),
            ConversionOutcome::Skipped { .. } => None,
        }
    }
}

impl ConversionFailurePolicy {
    /// Converts `amount`, applying this policy when the rate is missing.
    pub fn convert(
        self,
        exposure_id: &str,
        amount: Decimal,
        from: &CurrencyCode,
        rates: &RateSnapshot,
    ) -> PortfolioResult<ConversionOutcome> {
        match convert_to_eur(amount, from, rates) {
            Ok(eur) => Ok(ConversionOutcome::Converted(eur)),
            Err(err) => {
                let reason = err.to_string();
                match self {
                    ConversionFailurePolicy::ZeroFallback => {
                        Ok(ConversionOutcome::ZeroFallback { reason })
                    }
                    ConversionFailurePolicy::SkipRecord => Ok(ConversionOutcome::Skipped { reason }),
                    ConversionFailurePolicy::FailFast => Err(PortfolioError::ConversionFailed {
                        exposure_id: exposure_id.to_string(),
                        currency: from.to_string(),
                        reason,
                    }),
                }
            }
        }
    }
}
