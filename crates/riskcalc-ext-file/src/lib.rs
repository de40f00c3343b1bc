//! # Riskcalc Ext File
//!
//! File-based collaborators for the Riskcalc batch engine.
//!
//! This crate provides default implementations for local runs and tests:
//! - [`LocalFileStorage`]: source files and result documents on the local filesystem
//! - [`JsonExchangeRateSource`]: EUR rates from a JSON object
//! - [`CsvExchangeRateSource`]: EUR rates from a `currency,rate_to_eur` CSV
//! - [`StaticExchangeRateProvider`]: fixed in-memory rates
//!
//! For object stores or live rate feeds, implement the traits in `riskcalc-traits`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod rates;
mod storage;

pub use rates::*;
pub use storage::*;

use std::path::Path;
use std::sync::Arc;

use riskcalc_traits::{ExchangeRateProvider, TraitError};

/// Create a rate provider from a `.json` or `.csv` file.
pub fn load_exchange_rates(
    path: impl AsRef<Path>,
) -> Result<Arc<dyn ExchangeRateProvider>, TraitError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => Ok(Arc::new(JsonExchangeRateSource::new(path)?)),
        Some("csv") => Ok(Arc::new(CsvExchangeRateSource::new(path)?)),
        _ => Err(TraitError::InvalidInput(format!(
            "unsupported rate file '{}': expected .json or .csv",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcalc_core::CurrencyCode;

    #[tokio::test]
    async fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("rates.JSON");
        std::fs::write(&json, r#"{ "USD": "0.9" }"#).unwrap();

        let provider = load_exchange_rates(&json).unwrap();
        let rate = provider
            .get_rate(&CurrencyCode::new("USD").unwrap(), &CurrencyCode::eur())
            .await
            .unwrap();
        assert_eq!(rate.rate().to_string(), "0.9");

        assert!(matches!(
            load_exchange_rates(dir.path().join("rates.yaml")),
            Err(TraitError::InvalidInput(_))
        ));
    }
}
