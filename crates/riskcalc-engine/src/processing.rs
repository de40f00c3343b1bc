//! Chunked, cancellable batch calculation.
//!
//! Exposures are run through the pipeline one chunk at a time so progress
//! can be reported and cancellation observed between chunks. Each chunk is
//! itself mapped in parallel when the analytics config allows it.

use std::collections::HashMap;

use riskcalc_core::{BatchId, ExposureId, ExposureRecording, RawMitigationData};
use riskcalc_portfolio::{
    aggregate_exposures, AnalyticsConfig, ConcentrationCalculator, ConcentrationIndices,
    ExposurePipeline, PortfolioAggregate, ProcessedExposures,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Calculated exposures of a batch with their totals and indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCalculation {
    /// Calculated and skipped exposures, in source order.
    pub processed: ProcessedExposures,
    /// Totals and breakdowns.
    pub aggregate: PortfolioAggregate,
    /// HHI per taxonomy.
    pub concentration: ConcentrationIndices,
}

/// Runs a batch through the pipeline in chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkedCalculation<'a> {
    pipeline: ExposurePipeline<'a>,
    calculator: ConcentrationCalculator,
    analytics: &'a AnalyticsConfig,
    chunk_size: usize,
}

impl<'a> ChunkedCalculation<'a> {
    /// Creates a runner processing `chunk_size` exposures between progress reports.
    pub fn new(
        pipeline: ExposurePipeline<'a>,
        calculator: ConcentrationCalculator,
        analytics: &'a AnalyticsConfig,
        chunk_size: usize,
    ) -> Self {
        Self {
            pipeline,
            calculator,
            analytics,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Processes, aggregates and scores the batch.
    ///
    /// `on_progress` receives the running count of handled records after each
    /// chunk. Cancellation is checked before every chunk.
    pub fn run<F>(
        &self,
        batch_id: &BatchId,
        records: &[ExposureRecording],
        mitigations: &HashMap<ExposureId, Vec<RawMitigationData>>,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> EngineResult<BatchCalculation>
    where
        F: FnMut(usize) -> EngineResult<()>,
    {
        let mut processed = ProcessedExposures::default();

        for chunk in records.chunks(self.chunk_size) {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled(batch_id.clone()));
            }
            processed.extend(self.pipeline.process_all(chunk, mitigations, self.analytics)?);
            debug!(
                batch_id = %batch_id,
                processed = processed.len(),
                total = records.len(),
                "Chunk processed"
            );
            on_progress(processed.len())?;
        }

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled(batch_id.clone()));
        }

        let aggregate = aggregate_exposures(&mut processed.calculated, self.analytics);
        let concentration = self
            .calculator
            .calculate(&aggregate.geographic, &aggregate.sector);

        Ok(BatchCalculation {
            processed,
            aggregate,
            concentration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcalc_core::{CurrencyCode, GeographicRegion};
    use riskcalc_portfolio::{
        ConcentrationThresholds, ConversionFailurePolicy, ExposureClassifier, RateSnapshot,
        RiskLevel,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(id: &str, amount: Decimal, country: &str) -> ExposureRecording {
        ExposureRecording::new(id, "Client", amount, CurrencyCode::eur(), country, "CORPORATE")
            .unwrap()
    }

    fn calculator() -> ConcentrationCalculator {
        ConcentrationCalculator::new(ConcentrationThresholds::new(dec!(1500), dec!(2500)).unwrap())
    }

    #[test]
    fn test_reports_progress_per_chunk() {
        let classifier = ExposureClassifier::new();
        let rates = RateSnapshot::new();
        let pipeline =
            ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::ZeroFallback);
        let analytics = AnalyticsConfig::sequential();
        let runner = ChunkedCalculation::new(pipeline, calculator(), &analytics, 2);

        let records = vec![
            record("E1", dec!(100), "IT"),
            record("E2", dec!(200), "DE"),
            record("E3", dec!(700), "US"),
        ];
        let mut seen = Vec::new();
        let result = runner
            .run(
                &BatchId::new("B1"),
                &records,
                &HashMap::new(),
                &CancellationToken::new(),
                |n| {
                    seen.push(n);
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(seen, vec![2, 3]);
        assert_eq!(result.aggregate.total_portfolio.value(), dec!(1000));
        assert_eq!(result.concentration.geographic.value, dec!(5800));
        assert_eq!(result.concentration.geographic.level, RiskLevel::High);
        assert_eq!(
            result.aggregate.geographic.get(&GeographicRegion::Italy).unwrap().percentage,
            dec!(10.00)
        );
        assert_eq!(result.processed.calculated[2].percentage_of_total(), dec!(70.00));
    }

    #[test]
    fn test_cancellation_stops_before_next_chunk() {
        let classifier = ExposureClassifier::new();
        let rates = RateSnapshot::new();
        let pipeline =
            ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::ZeroFallback);
        let analytics = AnalyticsConfig::sequential();
        let runner = ChunkedCalculation::new(pipeline, calculator(), &analytics, 1);

        let cancel = CancellationToken::new();
        let records = vec![record("E1", dec!(1), "IT"), record("E2", dec!(1), "IT")];
        let result = runner.run(&BatchId::new("B1"), &records, &HashMap::new(), &cancel, |_| {
            cancel.cancel();
            Ok(())
        });

        assert!(matches!(result, Err(EngineError::Cancelled(_))));
    }

    #[test]
    fn test_empty_batch_scores_zero() {
        let classifier = ExposureClassifier::new();
        let rates = RateSnapshot::new();
        let pipeline =
            ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::ZeroFallback);
        let analytics = AnalyticsConfig::sequential();
        let runner = ChunkedCalculation::new(pipeline, calculator(), &analytics, 10);

        let mut calls = 0;
        let result = runner
            .run(
                &BatchId::new("B1"),
                &[],
                &HashMap::new(),
                &CancellationToken::new(),
                |_| {
                    calls += 1;
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(calls, 0);
        assert!(result.aggregate.total_portfolio.is_zero());
        assert_eq!(result.concentration.geographic.value, Decimal::ZERO);
        assert_eq!(result.concentration.sector.level, RiskLevel::Low);
    }
}
