//! Per-exposure calculation results.

use riskcalc_core::{
    CurrencyCode, EconomicSector, EurAmount, ExposureId, ExposureRecording, GeographicRegion,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::mitigation::ProtectedExposure;

/// Net EUR amount of one exposure with its concentration buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedExposure {
    /// Exposure identifier.
    pub exposure_id: ExposureId,
    /// Net exposure in EUR.
    pub amount_eur: EurAmount,
    /// Geographic bucket.
    pub region: GeographicRegion,
    /// Sector bucket.
    pub sector: EconomicSector,
}

/// A fully processed exposure as it appears in the result document.
///
/// Immutable after construction except for `percentage_of_total`, which only
/// the aggregator sets once the batch total is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedExposure {
    exposure_id: ExposureId,
    client_name: String,
    #[serde(with = "rust_decimal::serde::str")]
    original_amount: Decimal,
    original_currency: CurrencyCode,
    country_code: String,
    product_type: String,
    gross_exposure_eur: EurAmount,
    net_exposure_eur: EurAmount,
    total_mitigation_eur: EurAmount,
    mitigation_count: usize,
    has_mitigations: bool,
    fully_covered: bool,
    region: GeographicRegion,
    sector: EconomicSector,
    #[serde(with = "rust_decimal::serde::str")]
    percentage_of_total: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conversion_warnings: Vec<String>,
}

impl CalculatedExposure {
    /// Combines the input record, its netting result and its buckets.
    #[must_use]
    pub fn new(
        record: &ExposureRecording,
        protection: &ProtectedExposure,
        region: GeographicRegion,
        sector: EconomicSector,
    ) -> Self {
        Self {
            exposure_id: record.exposure_id().clone(),
            client_name: record.client_name().to_string(),
            original_amount: record.original_amount(),
            original_currency: record.original_currency().clone(),
            country_code: record.country_code().to_string(),
            product_type: record.product_type().to_string(),
            gross_exposure_eur: protection.gross_exposure(),
            net_exposure_eur: protection.net_exposure(),
            total_mitigation_eur: protection.total_mitigation(),
            mitigation_count: protection.mitigations().len(),
            has_mitigations: protection.has_mitigations(),
            fully_covered: protection.is_fully_covered(),
            region,
            sector,
            percentage_of_total: Decimal::ZERO,
            conversion_warnings: Vec::new(),
        }
    }

    /// Attaches conversion warnings (zero fallbacks, dropped mitigations).
    #[must_use]
    pub fn with_conversion_warnings(mut self, warnings: Vec<String>) -> Self {
        self.conversion_warnings = warnings;
        self
    }

    /// Exposure identifier.
    pub fn exposure_id(&self) -> &ExposureId {
        &self.exposure_id
    }

    /// Counterparty name.
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Amount in the original currency.
    pub fn original_amount(&self) -> Decimal {
        self.original_amount
    }

    /// Original currency.
    pub fn original_currency(&self) -> &CurrencyCode {
        &self.original_currency
    }

    /// Gross exposure in EUR.
    pub fn gross_exposure_eur(&self) -> EurAmount {
        self.gross_exposure_eur
    }

    /// Net exposure in EUR, the amount used for concentration.
    pub fn net_exposure_eur(&self) -> EurAmount {
        self.net_exposure_eur
    }

    /// Sum of converted mitigation values in EUR.
    pub fn total_mitigation_eur(&self) -> EurAmount {
        self.total_mitigation_eur
    }

    /// Number of mitigations applied.
    pub fn mitigation_count(&self) -> usize {
        self.mitigation_count
    }

    /// True when at least one mitigation was applied.
    pub fn has_mitigations(&self) -> bool {
        self.has_mitigations
    }

    /// True when mitigations cover the whole gross exposure.
    pub fn is_fully_covered(&self) -> bool {
        self.fully_covered
    }

    /// Geographic bucket.
    pub fn region(&self) -> GeographicRegion {
        self.region
    }

    /// Sector bucket.
    pub fn sector(&self) -> EconomicSector {
        self.sector
    }

    /// Share of the batch total (0-100, 2 dp). Zero until aggregated.
    pub fn percentage_of_total(&self) -> Decimal {
        self.percentage_of_total
    }

    /// Non-fatal conversion issues recorded for this exposure.
    pub fn conversion_warnings(&self) -> &[String] {
        &self.conversion_warnings
    }

    /// The view used by the aggregator.
    pub fn classified(&self) -> ClassifiedExposure {
        ClassifiedExposure {
            exposure_id: self.exposure_id.clone(),
            amount_eur: self.net_exposure_eur,
            region: self.region,
            sector: self.sector,
        }
    }

    pub(crate) fn set_percentage_of_total(&mut self, percentage: Decimal) {
        self.percentage_of_total = percentage;
    }
}

/// A record that was dropped from the batch, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedExposure {
    /// Position of the record in the source array, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
    /// Exposure identifier, when it could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_id: Option<ExposureId>,
    /// Why the record was skipped.
    pub reason: String,
}

impl SkippedExposure {
    /// Creates a skip entry.
    #[must_use]
    pub fn new(
        record_index: Option<usize>,
        exposure_id: Option<ExposureId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            record_index,
            exposure_id,
            reason: reason.into(),
        }
    }
}
