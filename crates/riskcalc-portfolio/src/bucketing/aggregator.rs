//! Batch-level aggregation into geographic and sector breakdowns.

use std::collections::BTreeMap;

use riskcalc_core::{round_half_up, EconomicSector, EurAmount, GeographicRegion};
use serde::{Deserialize, Serialize};

use super::breakdown::{Breakdown, GeographicBreakdown, SectorBreakdown};
use crate::parallel::{maybe_parallel_fold, maybe_parallel_for_each_mut};
use crate::types::{AnalyticsConfig, CalculatedExposure, ClassifiedExposure};

/// Totals and both breakdowns of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioAggregate {
    /// Sum of net exposures.
    pub total_portfolio: EurAmount,
    /// Number of exposures aggregated.
    pub exposure_count: usize,
    /// Breakdown by region.
    pub geographic: GeographicBreakdown,
    /// Breakdown by sector.
    pub sector: SectorBreakdown,
}

/// Partial sums; merged with an order-independent reduction.
#[derive(Debug, Clone, Default)]
struct BucketTotals {
    total: EurAmount,
    count: usize,
    regions: BTreeMap<GeographicRegion, (EurAmount, usize)>,
    sectors: BTreeMap<EconomicSector, (EurAmount, usize)>,
}

impl BucketTotals {
    fn add(mut self, amount: EurAmount, region: GeographicRegion, sector: EconomicSector) -> Self {
        self.total += amount;
        self.count += 1;
        let r = self.regions.entry(region).or_default();
        r.0 += amount;
        r.1 += 1;
        let s = self.sectors.entry(sector).or_default();
        s.0 += amount;
        s.1 += 1;
        self
    }

    fn merge(mut self, other: Self) -> Self {
        self.total += other.total;
        self.count += other.count;
        for (region, (amount, count)) in other.regions {
            let r = self.regions.entry(region).or_default();
            r.0 += amount;
            r.1 += count;
        }
        for (sector, (amount, count)) in other.sectors {
            let s = self.sectors.entry(sector).or_default();
            s.0 += amount;
            s.1 += count;
        }
        self
    }

    fn into_aggregate(self) -> PortfolioAggregate {
        PortfolioAggregate {
            total_portfolio: self.total,
            exposure_count: self.count,
            geographic: Breakdown::from_totals(self.regions, self.total),
            sector: Breakdown::from_totals(self.sectors, self.total),
        }
    }
}

/// Aggregates the batch and stamps each exposure's percentage of total.
///
/// Amounts are net exposures. An exposure's `percentage_of_total` is its net
/// amount over the batch total on the 0-100 scale, half-up to 2 dp, and zero
/// when the total is zero.
pub fn aggregate_exposures(
    exposures: &mut [CalculatedExposure],
    config: &AnalyticsConfig,
) -> PortfolioAggregate {
    let totals = maybe_parallel_fold(
        exposures,
        config,
        BucketTotals::default(),
        |acc, e| acc.add(e.net_exposure_eur(), e.region(), e.sector()),
        BucketTotals::merge,
    );

    let total = totals.total;
    maybe_parallel_for_each_mut(exposures, config, |e| {
        let pct = round_half_up(e.net_exposure_eur().percentage_of(total), 2);
        e.set_percentage_of_total(pct);
    });

    totals.into_aggregate()
}

/// Aggregates classified exposures without touching them.
pub fn aggregate_classified(
    exposures: &[ClassifiedExposure],
    config: &AnalyticsConfig,
) -> PortfolioAggregate {
    maybe_parallel_fold(
        exposures,
        config,
        BucketTotals::default(),
        |acc, e| acc.add(e.amount_eur, e.region, e.sector),
        BucketTotals::merge,
    )
    .into_aggregate()
}
