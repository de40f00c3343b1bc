//! Exchange-rate source traits.

use std::sync::Arc;

use async_trait::async_trait;
use riskcalc_core::{CurrencyCode, ExchangeRate};

use crate::error::TraitError;

// =============================================================================
// EXCHANGE RATE PROVIDER
// =============================================================================

/// Source of spot exchange rates.
///
/// Implementations must be safe to call concurrently from many batches.
/// An unknown pair is reported as [`TraitError::RateUnavailable`].
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Rate converting one unit of `from` into `to`.
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ExchangeRate, TraitError>;
}

#[async_trait]
impl<T: ExchangeRateProvider + ?Sized> ExchangeRateProvider for Arc<T> {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ExchangeRate, TraitError> {
        (**self).get_rate(from, to).await
    }
}
