//! Per-exposure pipeline: convert, net, classify.
//!
//! Each exposure is independent of the others, so a whole chunk can be mapped
//! in parallel; the aggregator then reduces the results.

use std::collections::HashMap;

use riskcalc_core::{EurAmount, ExposureId, ExposureRecording, RawMitigationData};

use crate::classification::ExposureClassifier;
use crate::error::PortfolioResult;
use crate::mitigation::{Mitigation, ProtectedExposure};
use crate::parallel::maybe_parallel_map;
use crate::types::{AnalyticsConfig, CalculatedExposure, SkippedExposure};
use crate::valuation::{ConversionFailurePolicy, ConversionOutcome, RateSnapshot};

/// Outcome of running one record through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposureOutcome {
    /// The exposure was fully processed.
    Calculated(CalculatedExposure),
    /// The exposure was dropped under the skip-record policy.
    Skipped(SkippedExposure),
}

/// Calculated and skipped exposures of one chunk, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedExposures {
    /// Exposures kept in the batch.
    pub calculated: Vec<CalculatedExposure>,
    /// Exposures dropped, with reasons.
    pub skipped: Vec<SkippedExposure>,
}

impl ProcessedExposures {
    /// Appends another chunk.
    pub fn extend(&mut self, other: ProcessedExposures) {
        self.calculated.extend(other.calculated);
        self.skipped.extend(other.skipped);
    }

    /// Number of records handled.
    pub fn len(&self) -> usize {
        self.calculated.len() + self.skipped.len()
    }

    /// True when nothing has been handled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Converts, nets and classifies exposures against one rate snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ExposurePipeline<'a> {
    classifier: &'a ExposureClassifier,
    rates: &'a RateSnapshot,
    policy: ConversionFailurePolicy,
}

impl<'a> ExposurePipeline<'a> {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(
        classifier: &'a ExposureClassifier,
        rates: &'a RateSnapshot,
        policy: ConversionFailurePolicy,
    ) -> Self {
        Self {
            classifier,
            rates,
            policy,
        }
    }

    /// Processes one record with its mitigations.
    ///
    /// A mitigation whose currency cannot be converted contributes nothing
    /// (unless the policy is fail-fast) and is reported as a warning on the
    /// exposure; an unconvertible exposure follows the policy.
    pub fn process(
        &self,
        record: &ExposureRecording,
        mitigations: &[RawMitigationData],
    ) -> PortfolioResult<ExposureOutcome> {
        let id = record.exposure_id();
        let mut warnings = Vec::new();

        let gross = match self.policy.convert(
            id.as_str(),
            record.original_amount(),
            record.original_currency(),
            self.rates,
        )? {
            ConversionOutcome::Converted(amount) => amount,
            ConversionOutcome::ZeroFallback { reason } => {
                warnings.push(format!("exposure valued at EUR zero: {reason}"));
                EurAmount::zero()
            }
            ConversionOutcome::Skipped { reason } => {
                return Ok(ExposureOutcome::Skipped(SkippedExposure::new(
                    None,
                    Some(id.clone()),
                    reason,
                )));
            }
        };

        let mut converted = Vec::with_capacity(mitigations.len());
        for raw in mitigations {
            match self
                .policy
                .convert(id.as_str(), raw.value(), raw.currency(), self.rates)?
            {
                ConversionOutcome::Converted(value) => converted.push(Mitigation::new(raw, value)?),
                ConversionOutcome::ZeroFallback { reason } | ConversionOutcome::Skipped { reason } => {
                    warnings.push(format!("{} mitigation ignored: {reason}", raw.mitigation_type()));
                }
            }
        }

        let protection = ProtectedExposure::calculate(id.clone(), gross, converted)?;
        let (region, sector) = self.classifier.classify(record);

        Ok(ExposureOutcome::Calculated(
            CalculatedExposure::new(record, &protection, region, sector)
                .with_conversion_warnings(warnings),
        ))
    }

    /// Processes a chunk, in parallel when `config` allows.
    ///
    /// Stops at the first error in input order (only possible under the
    /// fail-fast policy or on a precondition violation).
    pub fn process_all(
        &self,
        records: &[ExposureRecording],
        mitigations: &HashMap<ExposureId, Vec<RawMitigationData>>,
        config: &AnalyticsConfig,
    ) -> PortfolioResult<ProcessedExposures> {
        let outcomes = maybe_parallel_map(records, config, |record| {
            let own = mitigations
                .get(record.exposure_id())
                .map_or(&[][..], Vec::as_slice);
            self.process(record, own)
        });

        let mut processed = ProcessedExposures::default();
        for outcome in outcomes {
            match outcome? {
                ExposureOutcome::Calculated(e) => processed.calculated.push(e),
                ExposureOutcome::Skipped(s) => processed.skipped.push(s),
            }
        }
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortfolioError;
    use riskcalc_core::{CurrencyCode, EconomicSector, GeographicRegion, MitigationType};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(id: &str, amount: Decimal, ccy: &str) -> ExposureRecording {
        ExposureRecording::new(
            id,
            "Client",
            amount,
            CurrencyCode::new(ccy).unwrap(),
            "IT",
            "RETAIL_MORTGAGE",
        )
        .unwrap()
    }

    fn rates() -> RateSnapshot {
        let mut rates = RateSnapshot::new().with_rate(CurrencyCode::new("USD").unwrap(), dec!(0.9));
        rates.insert_failure(CurrencyCode::new("XYZ").unwrap(), "unknown currency");
        rates
    }

    #[test]
    fn test_process_converts_nets_and_classifies() {
        let classifier = ExposureClassifier::new();
        let rates = rates();
        let pipeline =
            ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::ZeroFallback);

        let mitigation = RawMitigationData::new(
            "E1",
            MitigationType::RealEstate,
            dec!(100),
            CurrencyCode::new("USD").unwrap(),
        )
        .unwrap();

        let outcome = pipeline
            .process(&record("E1", dec!(1000), "USD"), &[mitigation])
            .unwrap();
        let ExposureOutcome::Calculated(e) = outcome else {
            panic!("expected calculated exposure");
        };
        assert_eq!(e.gross_exposure_eur().value(), dec!(900));
        assert_eq!(e.total_mitigation_eur().value(), dec!(90));
        assert_eq!(e.net_exposure_eur().value(), dec!(810));
        assert_eq!(e.region(), GeographicRegion::Italy);
        assert_eq!(e.sector(), EconomicSector::RetailMortgage);
        assert!(e.conversion_warnings().is_empty());
    }

    #[test]
    fn test_zero_fallback_keeps_record() {
        let classifier = ExposureClassifier::new();
        let rates = rates();
        let pipeline =
            ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::ZeroFallback);

        let ExposureOutcome::Calculated(e) =
            pipeline.process(&record("E1", dec!(500), "XYZ"), &[]).unwrap()
        else {
            panic!("expected calculated exposure");
        };
        assert!(e.net_exposure_eur().is_zero());
        assert_eq!(e.conversion_warnings().len(), 1);
    }

    #[test]
    fn test_skip_policy_drops_record() {
        let classifier = ExposureClassifier::new();
        let rates = rates();
        let pipeline =
            ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::SkipRecord);

        let records = vec![record("E1", dec!(1), "EUR"), record("E2", dec!(1), "XYZ")];
        let processed = pipeline
            .process_all(&records, &HashMap::new(), &AnalyticsConfig::sequential())
            .unwrap();
        assert_eq!(processed.calculated.len(), 1);
        assert_eq!(processed.skipped.len(), 1);
        assert_eq!(
            processed.skipped[0].exposure_id,
            Some(ExposureId::new("E2"))
        );
    }

    #[test]
    fn test_fail_fast_policy_errors() {
        let classifier = ExposureClassifier::new();
        let rates = rates();
        let pipeline = ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::FailFast);

        let records = vec![record("E1", dec!(1), "EUR"), record("E2", dec!(1), "XYZ")];
        let result = pipeline.process_all(&records, &HashMap::new(), &AnalyticsConfig::sequential());
        assert!(matches!(result, Err(PortfolioError::ConversionFailed { .. })));
    }

    #[test]
    fn test_unconvertible_mitigation_is_ignored() {
        let classifier = ExposureClassifier::new();
        let rates = rates();
        let pipeline =
            ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::SkipRecord);

        let bad = RawMitigationData::new(
            "E1",
            MitigationType::Guarantee,
            dec!(400),
            CurrencyCode::new("XYZ").unwrap(),
        )
        .unwrap();
        let mut mitigations = HashMap::new();
        mitigations.insert(ExposureId::new("E1"), vec![bad]);

        let processed = pipeline
            .process_all(
                &[record("E1", dec!(500), "EUR")],
                &mitigations,
                &AnalyticsConfig::sequential(),
            )
            .unwrap();
        let e = &processed.calculated[0];
        assert_eq!(e.net_exposure_eur().value(), dec!(500));
        assert!(!e.has_mitigations());
        assert!(e.conversion_warnings()[0].contains("GUARANTEE"));
    }
}
