//! Batch-scoped portfolio analysis lifecycle.
//!
//! - [`ProcessingState`]: `PENDING -> IN_PROGRESS -> {COMPLETED, FAILED}`
//! - [`ProcessingProgress`]: processed counts with derived rate and ETA
//! - [`PortfolioAnalysis`]: the aggregate root owning state, progress and results

mod portfolio_analysis;
mod progress;
mod state;

pub use portfolio_analysis::{AnalysisFailure, AnalysisOutcome, PortfolioAnalysis};
pub use progress::ProcessingProgress;
pub use state::ProcessingState;
