//! Property-based tests for calculation invariants.
//!
//! These tests verify properties that must hold for any batch:
//! - Bucket amounts sum to the portfolio total
//! - Percentages sum to 100 within rounding
//! - Net exposure never exceeds gross and never goes negative
//! - HHI stays within its bounds and grows with concentration
//! - Parallel and sequential runs agree exactly

use std::collections::HashMap;

use proptest::prelude::*;
use riskcalc_portfolio::herfindahl_index;
use riskcalc_portfolio::prelude::*;
use rust_decimal_macros::dec;

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

const COUNTRIES: [&str; 9] = ["IT", "FR", "DE", "NL", "CH", "US", "CN", "", "XX"];
const PRODUCTS: [&str; 7] = [
    "RETAIL_MORTGAGE",
    "GOVERNMENT_BOND",
    "CORPORATE_LOAN",
    "INTERBANK",
    "COMMERCIAL_MORTGAGE",
    "CONSUMER_CREDIT",
    "",
];
const CURRENCIES: [&str; 3] = ["EUR", "USD", "JPY"];

/// Generates `n` records plus mitigations for roughly a third of them.
fn generate_batch(
    n: usize,
    seed: u64,
) -> (Vec<ExposureRecording>, HashMap<ExposureId, Vec<RawMitigationData>>) {
    let mut records = Vec::with_capacity(n);
    let mut mitigations = HashMap::new();

    for i in 0..n {
        // Use deterministic pseudo-random values based on seed and index
        let hash = simple_hash(seed, i as u64);
        let amount = Decimal::new((hash % 100_000_000) as i64, 2);
        let currency = CurrencyCode::new(CURRENCIES[hash as usize % CURRENCIES.len()]).unwrap();

        let record = ExposureRecording::new(
            format!("E{i}"),
            format!("Client {i}"),
            amount,
            currency.clone(),
            COUNTRIES[(hash >> 8) as usize % COUNTRIES.len()],
            PRODUCTS[(hash >> 16) as usize % PRODUCTS.len()],
        )
        .unwrap();

        if hash % 3 == 0 {
            // up to 150% of gross, so some records are over-collateralized
            let cover = amount * Decimal::from((hash >> 24) % 151) / dec!(100);
            let m = RawMitigationData::new(
                format!("E{i}"),
                MitigationType::FinancialCollateral,
                cover,
                currency,
            )
            .unwrap();
            mitigations.insert(record.exposure_id().clone(), vec![m]);
        }
        records.push(record);
    }

    (records, mitigations)
}

fn rates() -> RateSnapshot {
    RateSnapshot::new()
        .with_rate(CurrencyCode::new("USD").unwrap(), dec!(0.9212))
        .with_rate(CurrencyCode::new("JPY").unwrap(), dec!(0.0061))
}

fn process(
    records: &[ExposureRecording],
    mitigations: &HashMap<ExposureId, Vec<RawMitigationData>>,
    config: &AnalyticsConfig,
) -> (Vec<CalculatedExposure>, PortfolioAggregate) {
    let classifier = ExposureClassifier::new();
    let rates = rates();
    let mut processed = ExposurePipeline::new(&classifier, &rates, ConversionFailurePolicy::ZeroFallback)
        .process_all(records, mitigations, config)
        .unwrap();
    let aggregate = aggregate_exposures(&mut processed.calculated, config);
    (processed.calculated, aggregate)
}

/// Simple hash function for deterministic pseudo-random values.
fn simple_hash(seed: u64, i: u64) -> u64 {
    let mut x = seed.wrapping_add(i).wrapping_mul(0x517cc1b727220a95);
    x ^= x >> 32;
    x = x.wrapping_mul(0x517cc1b727220a95);
    x ^= x >> 32;
    x
}

fn percentage_tolerance(buckets: usize) -> Decimal {
    // each rounded share is off by at most 0.005
    Decimal::from(buckets) * dec!(0.005)
}

// =============================================================================
// BREAKDOWN PROPERTIES
// =============================================================================

#[test]
fn test_bucket_amounts_sum_to_total() {
    for seed in [1, 7, 42, 1234, 99_999] {
        for n in [1, 10, 250] {
            let (records, mitigations) = generate_batch(n, seed);
            let (_, aggregate) = process(&records, &mitigations, &AnalyticsConfig::sequential());

            assert_eq!(aggregate.geographic.amount_sum(), aggregate.total_portfolio);
            assert_eq!(aggregate.sector.amount_sum(), aggregate.total_portfolio);
            assert_eq!(aggregate.geographic.exposure_count(), n);
            assert_eq!(aggregate.sector.exposure_count(), n);
        }
    }
}

#[test]
fn test_percentages_sum_to_hundred() {
    for seed in [3, 11, 2024] {
        let (records, mitigations) = generate_batch(500, seed);
        let (_, aggregate) = process(&records, &mitigations, &AnalyticsConfig::sequential());
        assert!(!aggregate.total_portfolio.is_zero());

        let geo = aggregate.geographic.percentage_sum();
        let sector = aggregate.sector.percentage_sum();
        assert!(
            (geo - dec!(100)).abs() <= percentage_tolerance(aggregate.geographic.len()),
            "geographic percentages sum to {geo}"
        );
        assert!(
            (sector - dec!(100)).abs() <= percentage_tolerance(aggregate.sector.len()),
            "sector percentages sum to {sector}"
        );
    }
}

#[test]
fn test_netting_invariants() {
    let (records, mitigations) = generate_batch(300, 17);
    let (exposures, _) = process(&records, &mitigations, &AnalyticsConfig::sequential());

    for e in &exposures {
        let gross = e.gross_exposure_eur();
        let net = e.net_exposure_eur();
        let mitigation = e.total_mitigation_eur();

        assert!(!net.is_negative(), "{}: negative net", e.exposure_id());
        assert!(net <= gross, "{}: net above gross", e.exposure_id());
        if mitigation >= gross {
            assert!(net.is_zero());
            assert!(e.is_fully_covered());
        } else {
            assert_eq!(net, gross - mitigation);
        }
    }
}

#[test]
fn test_parallel_matches_sequential() {
    for seed in [5, 55, 555] {
        let (records, mitigations) = generate_batch(2_000, seed);
        let (seq_exposures, seq) = process(&records, &mitigations, &AnalyticsConfig::sequential());
        let (par_exposures, par) = process(
            &records,
            &mitigations,
            &AnalyticsConfig::default().with_threshold(10),
        );

        assert_eq!(seq, par);
        assert_eq!(seq_exposures, par_exposures);
    }
}

// =============================================================================
// HHI PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn prop_hhi_within_bounds(amounts in prop::collection::vec(0i64..1_000_000_000, 1..8)) {
        let amounts: Vec<EurAmount> = amounts
            .into_iter()
            .map(|a| EurAmount::new(Decimal::new(a, 2)))
            .collect();
        let total: EurAmount = amounts.iter().sum();
        let hhi = herfindahl_index(amounts.iter().copied(), total);

        if total.is_zero() {
            prop_assert_eq!(hhi, Decimal::ZERO);
        } else {
            let floor = dec!(10000) / Decimal::from(amounts.len());
            prop_assert!(hhi <= dec!(10000));
            prop_assert!(hhi >= floor - dec!(0.01), "hhi {} below floor {}", hhi, floor);
        }
    }

    #[test]
    fn prop_hhi_grows_with_concentration(
        large in 1i64..1_000_000,
        small in 1i64..1_000_000,
        rest in 0i64..1_000_000,
        moved_pct in 0i64..=100,
    ) {
        let (large, small) = if large >= small { (large, small) } else { (small, large) };
        let moved = small * moved_pct / 100;
        let total = EurAmount::new(Decimal::from(large + small + rest));

        let before = herfindahl_index(
            [large, small, rest].map(|a| EurAmount::new(Decimal::from(a))),
            total,
        );
        let after = herfindahl_index(
            [large + moved, small - moved, rest].map(|a| EurAmount::new(Decimal::from(a))),
            total,
        );
        prop_assert!(after >= before, "moving {} to the larger bucket lowered HHI {} -> {}", moved, before, after);
    }

    #[test]
    fn prop_net_never_negative(gross in 0i64..10_000_000, cover in prop::collection::vec(0i64..10_000_000, 0..4)) {
        let mitigations: Vec<Mitigation> = cover
            .into_iter()
            .map(|c| {
                let raw = RawMitigationData::new(
                    "E1",
                    MitigationType::Guarantee,
                    Decimal::new(c, 2),
                    CurrencyCode::eur(),
                )
                .unwrap();
                Mitigation::new(&raw, EurAmount::new(Decimal::new(c, 2))).unwrap()
            })
            .collect();
        let gross = EurAmount::new(Decimal::new(gross, 2));
        let protected = ProtectedExposure::calculate(ExposureId::new("E1"), gross, mitigations).unwrap();

        prop_assert!(!protected.net_exposure().is_negative());
        prop_assert!(protected.net_exposure() <= gross);
        prop_assert_eq!(
            protected.net_exposure() + protected.total_mitigation().min(gross),
            gross
        );
    }
}
