//! File-based exchange-rate sources.
//!
//! Every source holds rates quoted into EUR (units of EUR per unit of the
//! currency). Pairs not involving EUR are crossed through EUR.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use riskcalc_core::{CurrencyCode, ExchangeRate};
use riskcalc_traits::{ExchangeRateProvider, TraitError};

// =============================================================================
// RATE TABLE
// =============================================================================

/// Rates into EUR keyed by currency.
#[derive(Debug, Default)]
struct RateTable {
    rates: DashMap<CurrencyCode, Decimal>,
}

impl RateTable {
    fn insert(&self, currency: &str, rate: Decimal) -> Result<(), TraitError> {
        let code = CurrencyCode::new(currency).map_err(|e| TraitError::ParseError(e.to_string()))?;
        if rate <= Decimal::ZERO {
            return Err(TraitError::ParseError(format!(
                "rate for {code} must be positive, got {rate}"
            )));
        }
        self.rates.insert(code, rate);
        Ok(())
    }

    fn to_eur(&self, currency: &CurrencyCode) -> Option<Decimal> {
        if currency.is_eur() {
            return Some(Decimal::ONE);
        }
        self.rates.get(currency).map(|r| *r)
    }

    fn get(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<ExchangeRate, TraitError> {
        if from == to {
            return Ok(ExchangeRate::identity(from.clone()));
        }
        let unavailable = || TraitError::RateUnavailable {
            from: from.to_string(),
            to: to.to_string(),
        };
        let from_eur = self.to_eur(from).ok_or_else(unavailable)?;
        let to_eur = self.to_eur(to).ok_or_else(unavailable)?;
        let rate = from_eur.checked_div(to_eur).ok_or_else(unavailable)?;
        ExchangeRate::new(from.clone(), to.clone(), rate)
            .map_err(|e| TraitError::InvalidInput(e.to_string()))
    }

    fn len(&self) -> usize {
        self.rates.len()
    }
}

fn parse_rate(currency: &str, value: &Value) -> Result<Decimal, TraitError> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(TraitError::ParseError(format!(
                "rate for {currency} must be a number or string, got {other}"
            )))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| TraitError::ParseError(format!("invalid rate for {currency}: {e}")))
}

// =============================================================================
// STATIC PROVIDER
// =============================================================================

/// In-memory rates, for tests and fixed-rate runs.
#[derive(Debug, Default)]
pub struct StaticExchangeRateProvider {
    table: RateTable,
}

impl StaticExchangeRateProvider {
    /// Creates a provider that only knows EUR.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rate into EUR (builder style).
    ///
    /// Invalid codes and non-positive rates are ignored.
    #[must_use]
    pub fn with_rate(self, currency: &str, rate_to_eur: Decimal) -> Self {
        if let Err(e) = self.table.insert(currency, rate_to_eur) {
            debug!(currency, error = %e, "Ignoring static rate");
        }
        self
    }

    /// Number of non-EUR currencies known.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when only EUR is known.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }
}

#[async_trait]
impl ExchangeRateProvider for StaticExchangeRateProvider {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ExchangeRate, TraitError> {
        self.table.get(from, to)
    }
}

// =============================================================================
// JSON RATE SOURCE
// =============================================================================

/// Rates read from a JSON object of currency to EUR rate.
///
/// ```json
/// { "USD": "0.92", "GBP": 1.17, "JPY": "0.0061" }
/// ```
///
/// A `{ "rates": { ... } }` wrapper is also accepted.
#[derive(Debug)]
pub struct JsonExchangeRateSource {
    file_path: PathBuf,
    table: RateTable,
}

impl JsonExchangeRateSource {
    /// Loads rates from `file_path`.
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self, TraitError> {
        let source = Self {
            file_path: file_path.as_ref().to_path_buf(),
            table: RateTable::default(),
        };
        source.reload()?;
        Ok(source)
    }

    /// Re-reads the file, replacing every rate.
    pub fn reload(&self) -> Result<(), TraitError> {
        let content = std::fs::read_to_string(&self.file_path)?;
        let document: Value =
            serde_json::from_str(&content).map_err(|e| TraitError::ParseError(e.to_string()))?;

        let object = match &document {
            Value::Object(map) => match map.get("rates") {
                Some(Value::Object(rates)) => rates,
                _ => map,
            },
            _ => {
                return Err(TraitError::ParseError(
                    "rate file must contain a JSON object".into(),
                ))
            }
        };

        let fresh = RateTable::default();
        for (currency, value) in object {
            fresh.insert(currency, parse_rate(currency, value)?)?;
        }

        self.table.rates.clear();
        for (currency, rate) in fresh.rates {
            self.table.rates.insert(currency, rate);
        }
        debug!(path = %self.file_path.display(), rates = self.table.len(), "Loaded exchange rates");
        Ok(())
    }

    /// Number of non-EUR currencies known.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when only EUR is known.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }
}

#[async_trait]
impl ExchangeRateProvider for JsonExchangeRateSource {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ExchangeRate, TraitError> {
        self.table.get(from, to)
    }
}

// =============================================================================
// CSV RATE SOURCE
// =============================================================================

/// CSV record for rates.
#[derive(Debug, Deserialize)]
struct RateRecord {
    currency: String,
    rate_to_eur: String,
}

/// Rates read from a CSV file with `currency,rate_to_eur` columns.
#[derive(Debug)]
pub struct CsvExchangeRateSource {
    file_path: PathBuf,
    table: RateTable,
}

impl CsvExchangeRateSource {
    /// Loads rates from `file_path`.
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self, TraitError> {
        let source = Self {
            file_path: file_path.as_ref().to_path_buf(),
            table: RateTable::default(),
        };
        source.reload()?;
        Ok(source)
    }

    /// Re-reads the file, replacing every rate.
    pub fn reload(&self) -> Result<(), TraitError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.file_path)
            .map_err(|e| TraitError::IoError(e.to_string()))?;

        let fresh = RateTable::default();
        for result in reader.deserialize() {
            let record: RateRecord = result.map_err(|e| TraitError::ParseError(e.to_string()))?;
            let rate = parse_rate(&record.currency, &Value::String(record.rate_to_eur))?;
            fresh.insert(&record.currency, rate)?;
        }

        self.table.rates.clear();
        for (currency, rate) in fresh.rates {
            self.table.rates.insert(currency, rate);
        }
        debug!(path = %self.file_path.display(), rates = self.table.len(), "Loaded exchange rates");
        Ok(())
    }

    /// Number of non-EUR currencies known.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when only EUR is known.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }
}

#[async_trait]
impl ExchangeRateProvider for CsvExchangeRateSource {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ExchangeRate, TraitError> {
        self.table.get(from, to)
    }
}
