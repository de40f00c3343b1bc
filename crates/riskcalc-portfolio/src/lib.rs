//! # Riskcalc Portfolio
//!
//! Exposure classification, netting and concentration analytics for
//! large-exposure reporting.
//!
//! ## Design Philosophy
//!
//! All functions in this crate are **pure**:
//! - All inputs are explicit (rates arrive as a resolved [`RateSnapshot`])
//! - No I/O, no async, no clock reads outside the `now()` convenience wrappers
//! - Exact decimal arithmetic throughout; rounding is half-up and explicit
//!
//! ## Features
//!
//! - **Classification**: Country codes to regions, product codes to sectors
//! - **Valuation**: EUR conversion with a configurable failure policy
//! - **Netting**: Gross exposure less collateral and guarantees, floored at zero
//! - **Bucketing**: Geographic and sector breakdowns with percentage shares
//! - **Concentration**: Herfindahl-Hirschman indices with risk levels
//! - **Lifecycle**: The per-batch [`PortfolioAnalysis`] state machine
//!
//! ## Example
//!
//! ```rust
//! use riskcalc_portfolio::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! let exposures = vec![
//!     ClassifiedExposure {
//!         exposure_id: ExposureId::new("E1"),
//!         amount_eur: EurAmount::new(dec!(300)),
//!         region: GeographicRegion::Italy,
//!         sector: EconomicSector::Banking,
//!     },
//!     ClassifiedExposure {
//!         exposure_id: ExposureId::new("E2"),
//!         amount_eur: EurAmount::new(dec!(700)),
//!         region: GeographicRegion::EuOther,
//!         sector: EconomicSector::Banking,
//!     },
//! ];
//!
//! let aggregate = aggregate_classified(&exposures, &AnalyticsConfig::default());
//! let thresholds = ConcentrationThresholds::new(dec!(1500), dec!(2500)).unwrap();
//! let indices = ConcentrationCalculator::new(thresholds)
//!     .calculate(&aggregate.geographic, &aggregate.sector);
//!
//! assert_eq!(indices.geographic.value, dec!(5800));
//! assert_eq!(indices.sector.value, dec!(10000));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod bucketing;
pub mod classification;
pub mod concentration;
pub mod error;
pub mod mitigation;
pub mod parallel;
pub mod pipeline;
pub mod types;
pub mod valuation;

// Re-export main types at crate root
pub use analysis::{
    AnalysisFailure, AnalysisOutcome, PortfolioAnalysis, ProcessingProgress, ProcessingState,
};
pub use bucketing::{
    aggregate_classified, aggregate_exposures, Breakdown, GeographicBreakdown, PortfolioAggregate,
    SectorBreakdown, Share,
};
pub use classification::ExposureClassifier;
pub use concentration::{
    herfindahl_index, ConcentrationCalculator, ConcentrationIndex, ConcentrationIndices,
    ConcentrationThresholds, RiskLevel, HHI_MAX,
};
pub use error::{PortfolioError, PortfolioResult};
pub use mitigation::{Mitigation, ProtectedExposure};
pub use pipeline::{ExposureOutcome, ExposurePipeline, ProcessedExposures};
pub use types::{AnalyticsConfig, CalculatedExposure, ClassifiedExposure, SkippedExposure};
pub use valuation::{
    apply_rate, convert_to_eur, ConversionFailurePolicy, ConversionOutcome, RateSnapshot,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::analysis::{
        AnalysisFailure, AnalysisOutcome, PortfolioAnalysis, ProcessingProgress, ProcessingState,
    };
    pub use crate::bucketing::{
        aggregate_classified, aggregate_exposures, Breakdown, GeographicBreakdown,
        PortfolioAggregate, SectorBreakdown, Share,
    };
    pub use crate::classification::ExposureClassifier;
    pub use crate::concentration::{
        ConcentrationCalculator, ConcentrationIndex, ConcentrationIndices,
        ConcentrationThresholds, RiskLevel,
    };
    pub use crate::error::{PortfolioError, PortfolioResult};
    pub use crate::mitigation::{Mitigation, ProtectedExposure};
    pub use crate::pipeline::{ExposureOutcome, ExposurePipeline, ProcessedExposures};
    pub use crate::types::{
        AnalyticsConfig, CalculatedExposure, ClassifiedExposure, SkippedExposure,
    };
    pub use crate::valuation::{ConversionFailurePolicy, RateSnapshot};

    // Re-export core types
    pub use riskcalc_core::{
        BatchId, CurrencyCode, EconomicSector, EurAmount, ExposureId, ExposureRecording,
        GeographicRegion, MitigationType, RawMitigationData,
    };
    pub use rust_decimal::Decimal;
}
