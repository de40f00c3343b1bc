//! Benchmarks for the riskcalc-portfolio calculation core.
//!
//! Run with: cargo bench -p riskcalc-portfolio

use std::collections::HashMap;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use riskcalc_portfolio::prelude::*;
use rust_decimal_macros::dec;

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

const COUNTRIES: [&str; 8] = ["IT", "FR", "DE", "ES", "GB", "US", "JP", "BR"];
const PRODUCTS: [&str; 6] = [
    "RETAIL_MORTGAGE",
    "GOVERNMENT_BOND",
    "CORPORATE_LOAN",
    "INTERBANK_DEPOSIT",
    "SME_LOAN",
    "CONSUMER_CREDIT",
];
const CURRENCIES: [&str; 4] = ["EUR", "USD", "GBP", "CHF"];

fn create_records(n: usize) -> Vec<ExposureRecording> {
    (0..n)
        .map(|i| {
            ExposureRecording::new(
                format!("EXP_{i:06}"),
                format!("Client {i}"),
                Decimal::new(100_000 + (i as i64 * 7919) % 5_000_000, 2),
                CurrencyCode::new(CURRENCIES[i % CURRENCIES.len()]).unwrap(),
                COUNTRIES[i % COUNTRIES.len()],
                PRODUCTS[i % PRODUCTS.len()],
            )
            .unwrap()
        })
        .collect()
}

fn create_mitigations(records: &[ExposureRecording]) -> HashMap<ExposureId, Vec<RawMitigationData>> {
    records
        .iter()
        .step_by(3)
        .map(|r| {
            let m = RawMitigationData::new(
                r.exposure_id().as_str(),
                MitigationType::FinancialCollateral,
                r.original_amount() / dec!(4),
                r.original_currency().clone(),
            )
            .unwrap();
            (r.exposure_id().clone(), vec![m])
        })
        .collect()
}

fn create_rates() -> RateSnapshot {
    RateSnapshot::new()
        .with_rate(CurrencyCode::new("USD").unwrap(), dec!(0.9212))
        .with_rate(CurrencyCode::new("GBP").unwrap(), dec!(1.1734))
        .with_rate(CurrencyCode::new("CHF").unwrap(), dec!(1.0465))
}

// =============================================================================
// PIPELINE BENCHMARKS
// =============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let classifier = ExposureClassifier::new();
    let rates = create_rates();
    let pipeline = ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::ZeroFallback);

    let mut group = c.benchmark_group("exposure_pipeline");

    for size in [100, 1_000, 10_000].iter() {
        let records = create_records(*size);
        let mitigations = create_mitigations(&records);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, _| {
            b.iter(|| {
                pipeline.process_all(
                    black_box(&records),
                    &mitigations,
                    &AnalyticsConfig::sequential(),
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), size, |b, _| {
            b.iter(|| {
                pipeline.process_all(black_box(&records), &mitigations, &AnalyticsConfig::default())
            })
        });
    }

    group.finish();
}

// =============================================================================
// AGGREGATION BENCHMARKS
// =============================================================================

fn bench_aggregation(c: &mut Criterion) {
    let classifier = ExposureClassifier::new();
    let rates = create_rates();
    let pipeline = ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::ZeroFallback);
    let thresholds = ConcentrationThresholds::new(dec!(1500), dec!(2500)).unwrap();
    let calculator = ConcentrationCalculator::new(thresholds);

    let mut group = c.benchmark_group("aggregate_and_hhi");

    for size in [1_000, 10_000, 100_000].iter() {
        let records = create_records(*size);
        let processed = pipeline
            .process_all(&records, &HashMap::new(), &AnalyticsConfig::default())
            .unwrap();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter_batched(
                || processed.calculated.clone(),
                |mut exposures| {
                    let aggregate = aggregate_exposures(&mut exposures, &AnalyticsConfig::default());
                    calculator.calculate(&aggregate.geographic, &aggregate.sector)
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let classifier = ExposureClassifier::new();
    let records = create_records(1_000);

    c.bench_function("classify_1000", |b| {
        b.iter(|| {
            records
                .iter()
                .map(|r| classifier.classify(black_box(r)))
                .count()
        })
    });
}

// =============================================================================
// CRITERION GROUPS
// =============================================================================

criterion_group!(pipeline, bench_pipeline, bench_classification,);

criterion_group!(aggregation, bench_aggregation,);

criterion_main!(pipeline, aggregation);
