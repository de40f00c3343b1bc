//! # Riskcalc Engine
//!
//! Batch orchestration for concentration-risk calculation.
//!
//! This crate provides:
//! - [`StreamingParser`]: Incremental exposure-file ingestion with memory sampling
//! - [`CurrencyConverter`]: Cached EUR rate resolution into per-batch snapshots
//! - [`AnalysisRegistry`]: Per-batch lifecycle tracking and status queries
//! - [`BatchExecutor`]: Bounded worker pool with caller-runs overflow
//! - [`RiskCalculationEngine`]: Main engine running batches end to end
//!
//! ## Architecture
//!
//! ```text
//! FileStorage ─> download (retry) ─> StreamingParser ─┬─> ParsedExposureFile
//!                                                     │
//! ExchangeRateProvider ─> CurrencyConverter ─> RateSnapshot
//!                                                     │
//!                   ChunkedCalculation <──────────────┘
//!                          │
//!                          ├─> PortfolioAggregate + ConcentrationIndices
//!                          │
//!                          └─> CalculationResultDocument ─> FileStorage (retry)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let engine = RiskCalculationEngineBuilder::new()
//!     .with_config(RiskCalculationConfig::load("riskcalc.toml")?)
//!     .with_rates(rate_provider)
//!     .with_storage(file_storage)
//!     .build()?;
//!
//! let report = engine
//!     .submit_batch(BatchRequest::new("B-1", "08081", "file:///data/exposures.json"))
//!     .await
//!     .join()
//!     .await??;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod converter;
pub mod engine;
pub mod error;
pub mod executor;
pub mod memory;
pub mod metrics;
pub mod output;
pub mod processing;
pub mod registry;
pub mod runtime;
pub mod streaming;

// Re-exports
pub use builder::RiskCalculationEngineBuilder;
pub use converter::CurrencyConverter;
pub use engine::{BatchReport, BatchRequest, RiskCalculationEngine};
pub use error::{EngineError, EngineResult, ErrorCode};
pub use executor::{BatchExecutor, BatchHandle};
pub use memory::{MemoryAlert, MemoryProbe, SystemMemoryProbe};
pub use metrics::{BatchMetrics, BatchMetricsSnapshot};
pub use output::{CalculationResultDocument, FORMAT_VERSION};
pub use processing::{BatchCalculation, ChunkedCalculation};
pub use registry::{AnalysisRegistry, AnalysisWriter, BatchStatus};
pub use runtime::{AttemptOutcome, AttemptRecord, Retried, RetryConfig, RetryFailure};
pub use streaming::{BankInfo, ParseFailure, ParseStats, ParsedExposureFile, StreamingParser};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::RiskCalculationEngineBuilder;
    pub use crate::engine::{BatchReport, BatchRequest, RiskCalculationEngine};
    pub use crate::error::{EngineError, EngineResult, ErrorCode};
    pub use crate::output::CalculationResultDocument;
    pub use crate::registry::BatchStatus;

    pub use riskcalc_config::{RiskCalculationConfig, Validate};
    pub use riskcalc_core::{BankId, BatchId, CurrencyCode, EurAmount};
    pub use riskcalc_portfolio::{ConcentrationIndices, ProcessingState, RiskLevel};
    pub use riskcalc_traits::{ExchangeRateProvider, FileStorage, TraitError};
}
