//! Currency codes and exchange rates.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 alphabetic currency code.
///
/// Normalized to upper case on construction. Any well-formed three-letter
/// code is accepted; whether a rate exists for it is the rate provider's
/// concern, not this type's.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses and normalizes a currency code.
    pub fn new(code: impl AsRef<str>) -> CoreResult<Self> {
        let trimmed = code.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::missing_field("currency"));
        }
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::invalid_currency(
                trimmed,
                "expected three ASCII letters",
            ));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The euro, the reporting currency.
    #[must_use]
    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    /// Returns the three-letter code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for EUR.
    #[must_use]
    pub fn is_eur(&self) -> bool {
        self.0 == "EUR"
    }

    /// Number of decimal places in the currency's minor unit.
    #[must_use]
    pub fn minor_units(&self) -> u32 {
        match self.0.as_str() {
            "BIF" | "CLP" | "DJF" | "GNF" | "ISK" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF"
            | "UGX" | "UYI" | "VND" | "VUV" | "XAF" | "XOF" | "XPF" => 0,
            "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
            _ => 2,
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversion rate: one unit of `from` buys `rate` units of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    from: CurrencyCode,
    to: CurrencyCode,
    rate: Decimal,
}

impl ExchangeRate {
    /// Creates a rate, rejecting zero and negative values.
    pub fn new(from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> CoreResult<Self> {
        if rate <= Decimal::ZERO {
            return Err(CoreError::InvalidRate {
                from: from.to_string(),
                to: to.to_string(),
                rate,
            });
        }
        Ok(Self { from, to, rate })
    }

    /// Identity rate for a currency against itself.
    #[must_use]
    pub fn identity(currency: CurrencyCode) -> Self {
        Self {
            from: currency.clone(),
            to: currency,
            rate: Decimal::ONE,
        }
    }

    /// Source currency.
    #[must_use]
    pub fn from(&self) -> &CurrencyCode {
        &self.from
    }

    /// Target currency.
    #[must_use]
    pub fn to(&self) -> &CurrencyCode {
        &self.to
    }

    /// Units of `to` per unit of `from`.
    #[must_use]
    pub fn rate(&self) -> Decimal {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_normalization() {
        let code = CurrencyCode::new(" gbp ").unwrap();
        assert_eq!(code.as_str(), "GBP");
        assert!(!code.is_eur());
        assert!(CurrencyCode::new("eur").unwrap().is_eur());
    }

    #[test]
    fn test_currency_rejects_malformed() {
        assert!(matches!(
            CurrencyCode::new(""),
            Err(CoreError::MissingField { .. })
        ));
        assert!(CurrencyCode::new("EURO").is_err());
        assert!(CurrencyCode::new("E1R").is_err());
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(CurrencyCode::eur().minor_units(), 2);
        assert_eq!(CurrencyCode::new("JPY").unwrap().minor_units(), 0);
        assert_eq!(CurrencyCode::new("KWD").unwrap().minor_units(), 3);
    }

    #[test]
    fn test_currency_serde() {
        let code: CurrencyCode = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(code.as_str(), "USD");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"USD\"");
        assert!(serde_json::from_str::<CurrencyCode>("\"US\"").is_err());
    }

    #[test]
    fn test_exchange_rate_must_be_positive() {
        let usd = CurrencyCode::new("USD").unwrap();
        assert!(ExchangeRate::new(usd.clone(), CurrencyCode::eur(), dec!(0)).is_err());
        assert!(ExchangeRate::new(usd.clone(), CurrencyCode::eur(), dec!(-1.1)).is_err());

        let rate = ExchangeRate::new(usd, CurrencyCode::eur(), dec!(0.92)).unwrap();
        assert_eq!(rate.rate(), dec!(0.92));
        assert_eq!(rate.to().as_str(), "EUR");
    }
}
