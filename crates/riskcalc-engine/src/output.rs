//! The stored calculation result document.
//!
//! The document is a stable, camelCase JSON contract for downstream
//! reporting, kept separate from the domain types so that internal
//! refactoring never changes the wire format. Monetary values, percentages
//! and indices are decimal strings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use riskcalc_core::{BankId, BatchId, CurrencyCode, EurAmount, ExposureId};
use riskcalc_portfolio::{
    Breakdown, CalculatedExposure, ConcentrationIndices, RiskLevel, SkippedExposure,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::processing::BatchCalculation;
use crate::streaming::BankInfo;

/// Current document layout version.
pub const FORMAT_VERSION: u32 = 1;

/// Everything written to storage for a completed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResultDocument {
    /// Layout version.
    pub format_version: u32,
    /// Batch identifier.
    pub batch_id: BatchId,
    /// Submitting bank.
    pub bank_id: BankId,
    /// Calculation time.
    pub calculated_at: DateTime<Utc>,
    /// Bank metadata from the source file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<BankInfoDocument>,
    /// Totals, breakdowns and indices.
    pub summary: ResultSummary,
    /// One entry per calculated exposure, in source order.
    pub exposures: Vec<ExposureDocument>,
    /// Exposure records left out of the batch.
    pub skipped_records: Vec<SkippedRecordDocument>,
    /// Mitigation records left out of the batch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_mitigations: Vec<SkippedRecordDocument>,
}

/// Bank metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankInfoDocument {
    /// Bank display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    /// ABI code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi_code: Option<String>,
    /// Legal entity identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lei_code: Option<String>,
}

/// Batch-level figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    /// Number of calculated exposures.
    pub total_exposures: usize,
    /// Sum of net exposures.
    pub total_amount_eur: EurAmount,
    /// Buckets keyed by region code.
    pub geographic_breakdown: BTreeMap<String, BucketDocument>,
    /// Buckets keyed by sector code.
    pub sector_breakdown: BTreeMap<String, BucketDocument>,
    /// HHI per taxonomy.
    pub concentration_indices: ConcentrationDocument,
}

/// One bucket of a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketDocument {
    /// Bucket amount.
    pub amount_eur: EurAmount,
    /// Share of total, 0-100.
    #[serde(with = "rust_decimal::serde::str")]
    pub percentage: Decimal,
    /// Member exposures.
    pub count: usize,
}

/// Both indices with their levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationDocument {
    /// Geographic HHI.
    #[serde(with = "rust_decimal::serde::str")]
    pub herfindahl_geographic: Decimal,
    /// Sector HHI.
    #[serde(with = "rust_decimal::serde::str")]
    pub herfindahl_sector: Decimal,
    /// Geographic level.
    pub geographic_risk_level: RiskLevel,
    /// Sector level.
    pub sector_risk_level: RiskLevel,
}

/// One calculated exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureDocument {
    /// Exposure identifier.
    pub exposure_id: ExposureId,
    /// Counterparty name.
    pub client_name: String,
    /// Amount in the original currency.
    #[serde(with = "rust_decimal::serde::str")]
    pub original_amount: Decimal,
    /// Original currency.
    pub original_currency: CurrencyCode,
    /// Gross exposure in EUR.
    pub gross_exposure_eur: EurAmount,
    /// Net exposure in EUR.
    pub net_exposure_eur: EurAmount,
    /// Converted mitigation total.
    pub total_mitigation_eur: EurAmount,
    /// Mitigations applied.
    pub mitigation_count: usize,
    /// Mitigations cover the gross exposure.
    pub fully_covered: bool,
    /// Region code.
    pub geographic_region: String,
    /// Sector code.
    pub economic_sector: String,
    /// Share of the batch total, 0-100.
    #[serde(with = "rust_decimal::serde::str")]
    pub percentage_of_total: Decimal,
    /// Non-fatal conversion issues.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversion_warnings: Vec<String>,
}

/// A record left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecordDocument {
    /// Position in the source array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
    /// Exposure identifier, when readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_id: Option<ExposureId>,
    /// Why it was skipped.
    pub reason: String,
}

impl CalculationResultDocument {
    /// Builds the document for a calculated batch.
    ///
    /// `skipped_records` holds parse-time skips; policy skips from the
    /// calculation are appended after them.
    pub fn new(
        batch_id: BatchId,
        bank_id: BankId,
        bank_info: Option<&BankInfo>,
        calculation: &BatchCalculation,
        skipped_records: &[SkippedExposure],
        skipped_mitigations: &[SkippedExposure],
        calculated_at: DateTime<Utc>,
    ) -> Self {
        let aggregate = &calculation.aggregate;
        Self {
            format_version: FORMAT_VERSION,
            batch_id,
            bank_id,
            calculated_at,
            bank_info: bank_info.map(BankInfoDocument::from),
            summary: ResultSummary {
                total_exposures: calculation.processed.calculated.len(),
                total_amount_eur: aggregate.total_portfolio,
                geographic_breakdown: buckets(&aggregate.geographic),
                sector_breakdown: buckets(&aggregate.sector),
                concentration_indices: ConcentrationDocument::from(&calculation.concentration),
            },
            exposures: calculation
                .processed
                .calculated
                .iter()
                .map(ExposureDocument::from)
                .collect(),
            skipped_records: skipped_records
                .iter()
                .chain(&calculation.processed.skipped)
                .map(SkippedRecordDocument::from)
                .collect(),
            skipped_mitigations: skipped_mitigations
                .iter()
                .map(SkippedRecordDocument::from)
                .collect(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Internal(format!("result serialization failed: {e}")))
    }

    /// Parses a stored document.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::ParseError(format!("invalid result document: {e}")))
    }
}

fn buckets<K>(breakdown: &Breakdown<K>) -> BTreeMap<String, BucketDocument>
where
    K: Ord + Copy + ToString,
{
    breakdown
        .iter()
        .map(|(key, share)| {
            (
                key.to_string(),
                BucketDocument {
                    amount_eur: share.amount_eur,
                    percentage: share.percentage,
                    count: share.count,
                },
            )
        })
        .collect()
}

impl From<&BankInfo> for BankInfoDocument {
    fn from(info: &BankInfo) -> Self {
        Self {
            bank_name: info.bank_name.clone(),
            abi_code: info.abi_code.clone(),
            lei_code: info.lei_code.clone(),
        }
    }
}

impl From<&ConcentrationIndices> for ConcentrationDocument {
    fn from(indices: &ConcentrationIndices) -> Self {
        Self {
            herfindahl_geographic: indices.geographic.value,
            herfindahl_sector: indices.sector.value,
            geographic_risk_level: indices.geographic.level,
            sector_risk_level: indices.sector.level,
        }
    }
}

impl From<&CalculatedExposure> for ExposureDocument {
    fn from(e: &CalculatedExposure) -> Self {
        Self {
            exposure_id: e.exposure_id().clone(),
            client_name: e.client_name().to_string(),
            original_amount: e.original_amount(),
            original_currency: e.original_currency().clone(),
            gross_exposure_eur: e.gross_exposure_eur(),
            net_exposure_eur: e.net_exposure_eur(),
            total_mitigation_eur: e.total_mitigation_eur(),
            mitigation_count: e.mitigation_count(),
            fully_covered: e.is_fully_covered(),
            geographic_region: e.region().code().to_string(),
            economic_sector: e.sector().code().to_string(),
            percentage_of_total: e.percentage_of_total(),
            conversion_warnings: e.conversion_warnings().to_vec(),
        }
    }
}

impl From<&SkippedExposure> for SkippedRecordDocument {
    fn from(s: &SkippedExposure) -> Self {
        Self {
            record_index: s.record_index,
            exposure_id: s.exposure_id.clone(),
            reason: s.reason.clone(),
        }
    }
}
