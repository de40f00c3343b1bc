//! Concentration bucketing of classified exposures.
//!
//! - [`Breakdown`]: per-bucket amount, count and percentage share
//! - [`aggregate_exposures`]: batch totals plus geographic and sector breakdowns

mod aggregator;
mod breakdown;

pub use aggregator::{aggregate_classified, aggregate_exposures, PortfolioAggregate};
pub use breakdown::{Breakdown, GeographicBreakdown, SectorBreakdown, Share};
