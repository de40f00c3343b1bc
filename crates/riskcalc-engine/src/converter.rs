//! Currency conversion against an exchange-rate provider.
//!
//! The converter resolves rates once per currency and hands the calculation
//! core a [`RateSnapshot`], so every exposure in a batch is valued against
//! the same rates and the core itself never performs I/O.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use riskcalc_core::{CurrencyCode, EurAmount};
use riskcalc_portfolio::{apply_rate, RateSnapshot};
use riskcalc_traits::{ExchangeRateProvider, TraitError};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Converts amounts to EUR, caching successful rate lookups.
pub struct CurrencyConverter {
    provider: Arc<dyn ExchangeRateProvider>,
    cache: DashMap<CurrencyCode, Decimal>,
    cache_enabled: bool,
}

impl CurrencyConverter {
    /// Creates a converter with caching enabled.
    pub fn new(provider: Arc<dyn ExchangeRateProvider>) -> Self {
        Self::with_cache(provider, true)
    }

    /// Creates a converter, optionally without caching.
    pub fn with_cache(provider: Arc<dyn ExchangeRateProvider>, cache_enabled: bool) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
            cache_enabled,
        }
    }

    /// Rate from `currency` to EUR. EUR itself is always 1.
    pub async fn rate_to_eur(&self, currency: &CurrencyCode) -> Result<Decimal, TraitError> {
        if currency.is_eur() {
            return Ok(Decimal::ONE);
        }
        if self.cache_enabled {
            if let Some(rate) = self.cache.get(currency) {
                return Ok(*rate);
            }
        }

        let eur = CurrencyCode::eur();
        let rate = self.provider.get_rate(currency, &eur).await?;
        if rate.from() != currency || !rate.to().is_eur() {
            return Err(TraitError::InvalidInput(format!(
                "provider answered {}/{} for {currency}/EUR",
                rate.from(),
                rate.to()
            )));
        }

        debug!(currency = %currency, rate = %rate.rate(), "Resolved exchange rate");
        if self.cache_enabled {
            self.cache.insert(currency.clone(), rate.rate());
        }
        Ok(rate.rate())
    }

    /// Converts one amount to EUR.
    ///
    /// EUR amounts pass through unchanged with their scale; others are
    /// multiplied by the rate and rounded to the EUR minor unit.
    pub async fn convert_to_eur(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
    ) -> Result<EurAmount, TraitError> {
        if from.is_eur() {
            return Ok(EurAmount::new(amount));
        }
        let rate = self.rate_to_eur(from).await?;
        Ok(apply_rate(amount, rate))
    }

    /// Resolves every currency once into a snapshot.
    ///
    /// A failed lookup is recorded in the snapshot rather than returned, so
    /// the failure policy decides later what happens to affected exposures.
    pub async fn snapshot<'a, I>(&self, currencies: I) -> RateSnapshot
    where
        I: IntoIterator<Item = &'a CurrencyCode>,
    {
        let distinct: BTreeSet<&CurrencyCode> =
            currencies.into_iter().filter(|c| !c.is_eur()).collect();

        let mut snapshot = RateSnapshot::new();
        for currency in distinct {
            match self.rate_to_eur(currency).await {
                Ok(rate) => snapshot.insert_rate(currency.clone(), rate),
                Err(e) => {
                    warn!(currency = %currency, error = %e, "Exchange rate unavailable");
                    snapshot.insert_failure(currency.clone(), e.to_string());
                }
            }
        }
        snapshot
    }

    /// Number of cached rates.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Drops all cached rates.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for CurrencyConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyConverter")
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_size", &self.cache.len())
            .finish_non_exhaustive()
    }
}
