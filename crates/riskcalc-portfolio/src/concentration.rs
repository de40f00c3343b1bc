//! Herfindahl-Hirschman concentration indices.
//!
//! `HHI = sum(share_i^2)` with `share_i` on the 0-100 scale, so a single
//! bucket holding the whole portfolio scores 10,000. Shares are taken from
//! the exact bucket amounts rather than the rounded percentages, which keeps
//! the index monotone in concentration; only the final value is rounded.

use riskcalc_core::{round_half_up, EurAmount};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bucketing::{Breakdown, GeographicBreakdown, SectorBreakdown};
use crate::error::{PortfolioError, PortfolioResult};

/// Largest possible index (one bucket, 100%).
pub const HHI_MAX: Decimal = dec!(10000);

/// Qualitative concentration level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Below the medium breakpoint.
    Low,
    /// From the medium breakpoint up to the high breakpoint.
    Medium,
    /// At or above the high breakpoint.
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        f.write_str(s)
    }
}

/// Named HHI breakpoints: `LOW < medium_from <= MEDIUM < high_from <= HIGH`.
///
/// No default values exist; breakpoints always come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Breakpoints")]
pub struct ConcentrationThresholds {
    #[serde(with = "rust_decimal::serde::str")]
    medium_from: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high_from: Decimal,
}

#[derive(Deserialize)]
struct Breakpoints {
    #[serde(with = "rust_decimal::serde::str")]
    medium_from: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high_from: Decimal,
}

impl TryFrom<Breakpoints> for ConcentrationThresholds {
    type Error = PortfolioError;

    fn try_from(b: Breakpoints) -> Result<Self, Self::Error> {
        Self::new(b.medium_from, b.high_from)
    }
}

impl ConcentrationThresholds {
    /// Validates `0 < medium_from < high_from <= 10,000`.
    pub fn new(medium_from: Decimal, high_from: Decimal) -> PortfolioResult<Self> {
        if medium_from <= Decimal::ZERO {
            return Err(PortfolioError::invalid_thresholds(format!(
                "medium_from must be positive, got {medium_from}"
            )));
        }
        if high_from <= medium_from {
            return Err(PortfolioError::invalid_thresholds(format!(
                "high_from ({high_from}) must exceed medium_from ({medium_from})"
            )));
        }
        if high_from > HHI_MAX {
            return Err(PortfolioError::invalid_thresholds(format!(
                "high_from ({high_from}) exceeds the maximum index {HHI_MAX}"
            )));
        }
        Ok(Self {
            medium_from,
            high_from,
        })
    }

    /// Lower bound of the MEDIUM band.
    pub fn medium_from(&self) -> Decimal {
        self.medium_from
    }

    /// Lower bound of the HIGH band.
    pub fn high_from(&self) -> Decimal {
        self.high_from
    }

    /// Level of an index value.
    pub fn classify(&self, hhi: Decimal) -> RiskLevel {
        if hhi >= self.high_from {
            RiskLevel::High
        } else if hhi >= self.medium_from {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// An index value with its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationIndex {
    /// HHI on the 0-10,000 scale, half-up to 2 dp.
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    /// Level under the configured thresholds.
    pub level: RiskLevel,
}

/// Indices for both taxonomies of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationIndices {
    /// Geographic HHI.
    pub geographic: ConcentrationIndex,
    /// Sector HHI.
    pub sector: ConcentrationIndex,
}

/// HHI of `amounts` relative to `total`, half-up to 2 dp.
///
/// Zero when `total` is zero.
pub fn herfindahl_index<I>(amounts: I, total: EurAmount) -> Decimal
where
    I: IntoIterator<Item = EurAmount>,
{
    if total.is_zero() {
        return round_half_up(Decimal::ZERO, 2);
    }
    // fractions stay <= 1 so squaring cannot overflow
    let sum_sq: Decimal = amounts
        .into_iter()
        .map(|a| {
            let fraction = a.value() / total.value();
            fraction * fraction
        })
        .sum();
    round_half_up(sum_sq * HHI_MAX, 2)
}

/// Turns breakdowns into concentration indices.
#[derive(Debug, Clone, Copy)]
pub struct ConcentrationCalculator {
    thresholds: ConcentrationThresholds,
}

impl ConcentrationCalculator {
    /// Creates a calculator with the given breakpoints.
    #[must_use]
    pub fn new(thresholds: ConcentrationThresholds) -> Self {
        Self { thresholds }
    }

    /// The configured breakpoints.
    pub fn thresholds(&self) -> &ConcentrationThresholds {
        &self.thresholds
    }

    /// Index of one breakdown. An empty or zero-total breakdown scores 0.
    pub fn index<K: Ord + Copy>(&self, breakdown: &Breakdown<K>) -> ConcentrationIndex {
        let value = herfindahl_index(
            breakdown.iter().map(|(_, share)| share.amount_eur),
            breakdown.total(),
        );
        ConcentrationIndex {
            value,
            level: self.thresholds.classify(value),
        }
    }

    /// Indices for both breakdowns.
    pub fn calculate(
        &self,
        geographic: &GeographicBreakdown,
        sector: &SectorBreakdown,
    ) -> ConcentrationIndices {
        ConcentrationIndices {
            geographic: self.index(geographic),
            sector: self.index(sector),
        }
    }
}
