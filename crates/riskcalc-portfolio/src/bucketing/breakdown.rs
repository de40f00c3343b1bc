//! Bucket breakdowns keyed by region or sector.

use std::collections::BTreeMap;

use riskcalc_core::{round_half_up, EconomicSector, EurAmount, GeographicRegion};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One bucket's slice of the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Sum of member net exposures, exact.
    pub amount_eur: EurAmount,
    /// Share of the portfolio total on the 0-100 scale, half-up to 2 dp.
    #[serde(with = "rust_decimal::serde::str")]
    pub percentage: Decimal,
    /// Number of member exposures.
    pub count: usize,
}

/// Amount and percentage share per bucket.
///
/// Only buckets with at least one member are present. Bucket amounts are
/// kept exact so that they sum to `total` without tolerance; percentages
/// are rounded and sum to 100.00 within rounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize",
    deserialize = "K: Deserialize<'de> + Ord"
))]
pub struct Breakdown<K: Ord> {
    buckets: BTreeMap<K, Share>,
    total: EurAmount,
}

/// Breakdown by [`GeographicRegion`].
pub type GeographicBreakdown = Breakdown<GeographicRegion>;

/// Breakdown by [`EconomicSector`].
pub type SectorBreakdown = Breakdown<EconomicSector>;

impl<K: Ord + Copy> Breakdown<K> {
    /// A breakdown with no buckets and a zero total.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            buckets: BTreeMap::new(),
            total: EurAmount::zero(),
        }
    }

    /// Builds the breakdown from per-bucket `(amount, count)` totals.
    ///
    /// Percentages are zero for every bucket when `total` is zero.
    #[must_use]
    pub fn from_totals(totals: BTreeMap<K, (EurAmount, usize)>, total: EurAmount) -> Self {
        let buckets = totals
            .into_iter()
            .map(|(key, (amount, count))| {
                let percentage = round_half_up(amount.percentage_of(total), 2);
                (
                    key,
                    Share {
                        amount_eur: amount,
                        percentage,
                        count,
                    },
                )
            })
            .collect();
        Self { buckets, total }
    }

    /// Share of one bucket, if it has members.
    pub fn get(&self, key: &K) -> Option<&Share> {
        self.buckets.get(key)
    }

    /// Buckets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Share)> {
        self.buckets.iter()
    }

    /// Portfolio total the percentages refer to.
    pub fn total(&self) -> EurAmount {
        self.total
    }

    /// Number of non-empty buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no bucket has members.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of bucket amounts.
    pub fn amount_sum(&self) -> EurAmount {
        self.buckets.values().map(|s| s.amount_eur).sum()
    }

    /// Sum of rounded bucket percentages.
    pub fn percentage_sum(&self) -> Decimal {
        self.buckets.values().map(|s| s.percentage).sum()
    }

    /// Sum of bucket member counts.
    pub fn exposure_count(&self) -> usize {
        self.buckets.values().map(|s| s.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn totals(entries: &[(GeographicRegion, Decimal, usize)]) -> BTreeMap<GeographicRegion, (EurAmount, usize)> {
        entries
            .iter()
            .map(|(k, a, c)| (*k, (EurAmount::new(*a), *c)))
            .collect()
    }

    #[test]
    fn test_percentages() {
        let b = GeographicBreakdown::from_totals(
            totals(&[
                (GeographicRegion::Italy, dec!(100), 1),
                (GeographicRegion::EuOther, dec!(200), 1),
                (GeographicRegion::NonEuropean, dec!(700), 1),
            ]),
            EurAmount::new(dec!(1000)),
        );

        assert_eq!(b.get(&GeographicRegion::Italy).unwrap().percentage, dec!(10));
        assert_eq!(b.get(&GeographicRegion::EuOther).unwrap().percentage, dec!(20));
        assert_eq!(b.get(&GeographicRegion::NonEuropean).unwrap().percentage, dec!(70));
        assert_eq!(b.percentage_sum(), dec!(100));
        assert_eq!(b.amount_sum(), b.total());
        assert_eq!(b.exposure_count(), 3);
    }

    #[test]
    fn test_thirds_round_half_up() {
        let b = GeographicBreakdown::from_totals(
            totals(&[
                (GeographicRegion::Italy, dec!(1), 1),
                (GeographicRegion::EuOther, dec!(1), 1),
                (GeographicRegion::NonEuropean, dec!(1), 1),
            ]),
            EurAmount::new(dec!(3)),
        );
        for (_, share) in b.iter() {
            assert_eq!(share.percentage, dec!(33.33));
        }
        assert_eq!(b.percentage_sum(), dec!(99.99));
    }

    #[test]
    fn test_zero_total_gives_zero_percentages() {
        let b = GeographicBreakdown::from_totals(
            totals(&[(GeographicRegion::Italy, dec!(0), 2)]),
            EurAmount::zero(),
        );
        assert_eq!(b.get(&GeographicRegion::Italy).unwrap().percentage, Decimal::ZERO);
        assert_eq!(b.get(&GeographicRegion::Italy).unwrap().count, 2);
    }

    #[test]
    fn test_serde_keys_are_bucket_codes() {
        let b = GeographicBreakdown::from_totals(
            totals(&[(GeographicRegion::EuOther, dec!(5), 1)]),
            EurAmount::new(dec!(5)),
        );
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["buckets"]["EU_OTHER"]["percentage"], "100.00");
        assert_eq!(json["buckets"]["EU_OTHER"]["count"], 1);

        let parsed: GeographicBreakdown = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, b);
    }
}
