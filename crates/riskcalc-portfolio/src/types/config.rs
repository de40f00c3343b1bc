//! Thread-pool settings for the exposure pipeline.

use serde::{Deserialize, Serialize};

/// Decides whether exposure processing fans out across rayon.
///
/// Small batches stay on the calling thread: splitting a few dozen records
/// costs more in task scheduling than the conversion work itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Allow the rayon pool at all. Ignored without the `parallel` feature.
    pub parallel: bool,

    /// Record count from which the rayon pool is used.
    pub parallel_threshold: usize,
}

/// Record count at which fan-out starts paying for itself.
const DEFAULT_PARALLEL_THRESHOLD: usize = 100;

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl AnalyticsConfig {
    /// Default settings: parallel from 100 records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never leaves the calling thread, whatever the batch size.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn with_parallel(self, parallel: bool) -> Self {
        Self { parallel, ..self }
    }

    #[must_use]
    #[allow(missing_docs)]
    pub fn with_threshold(self, parallel_threshold: usize) -> Self {
        Self {
            parallel_threshold,
            ..self
        }
    }

    /// Whether a batch of `records` exposures should use the rayon pool.
    #[must_use]
    pub fn should_parallelize(&self, records: usize) -> bool {
        if !cfg!(feature = "parallel") || !self.parallel {
            return false;
        }
        records >= self.parallel_threshold
    }
}
