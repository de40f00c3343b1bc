//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Configuration file failed validation.
    #[error("Configuration '{}' has {count} problem(s)", .path.display())]
    InvalidConfig {
        /// Checked file.
        path: PathBuf,
        /// Number of problems reported.
        count: usize,
    },

    /// Some batches did not complete.
    #[error("{failed} of {total} batch(es) failed")]
    BatchesFailed {
        /// Batches that failed or were refused.
        failed: usize,
        /// Batches submitted.
        total: usize,
    },
}
