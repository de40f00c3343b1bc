//! Validated exposure input records.

use super::{CurrencyCode, ExposureId};
use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One exposure as recorded by the reporting bank, before any conversion.
///
/// Immutable once built. Country and product codes are kept verbatim; a
/// blank or unknown code is not an error here, it is resolved to a fallback
/// bucket by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureRecording {
    exposure_id: ExposureId,
    client_name: String,
    #[serde(with = "rust_decimal::serde::str")]
    original_amount: Decimal,
    original_currency: CurrencyCode,
    country_code: String,
    product_type: String,
}

impl ExposureRecording {
    /// Builds a record, rejecting blank identifiers and negative amounts.
    pub fn new(
        exposure_id: impl Into<String>,
        client_name: impl Into<String>,
        original_amount: Decimal,
        original_currency: CurrencyCode,
        country_code: impl Into<String>,
        product_type: impl Into<String>,
    ) -> CoreResult<Self> {
        let exposure_id = exposure_id.into();
        if exposure_id.trim().is_empty() {
            return Err(CoreError::missing_field("exposure_id"));
        }
        let client_name = client_name.into();
        if client_name.trim().is_empty() {
            return Err(CoreError::missing_field("client_name"));
        }
        if original_amount.is_sign_negative() && !original_amount.is_zero() {
            return Err(CoreError::invalid_amount(
                "original_amount",
                original_amount,
                "exposure amount must not be negative",
            ));
        }

        Ok(Self {
            exposure_id: ExposureId::new(exposure_id.trim()),
            client_name,
            original_amount,
            original_currency,
            country_code: country_code.into(),
            product_type: product_type.into(),
        })
    }

    /// Exposure identifier.
    #[must_use]
    pub fn exposure_id(&self) -> &ExposureId {
        &self.exposure_id
    }

    /// Counterparty name.
    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Amount in the original currency.
    #[must_use]
    pub fn original_amount(&self) -> Decimal {
        self.original_amount
    }

    /// Original currency.
    #[must_use]
    pub fn original_currency(&self) -> &CurrencyCode {
        &self.original_currency
    }

    /// Counterparty country code as supplied.
    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Product or sector classification as supplied.
    #[must_use]
    pub fn product_type(&self) -> &str {
        &self.product_type
    }
}
