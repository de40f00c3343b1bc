//! Configuration sections.
//!
//! Every section except `concentration` has defaults, so a minimal file only
//! needs the two HHI breakpoints.

use std::collections::BTreeMap;
use std::time::Duration;

use riskcalc_core::EconomicSector;
use riskcalc_portfolio::{ConcentrationThresholds, ConversionFailurePolicy, HHI_MAX};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, ValidationError};

// =============================================================================
// CONCENTRATION
// =============================================================================

/// HHI breakpoints on the 0-10,000 scale.
///
/// Values may be written as TOML numbers or as decimal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationSettings {
    /// Lowest index value rated MEDIUM.
    #[serde(with = "rust_decimal::serde::str")]
    pub medium_from: Decimal,
    /// Lowest index value rated HIGH.
    #[serde(with = "rust_decimal::serde::str")]
    pub high_from: Decimal,
}

impl ConcentrationSettings {
    /// Builds the validated thresholds.
    pub fn thresholds(&self) -> ConfigResult<ConcentrationThresholds> {
        ConcentrationThresholds::new(self.medium_from, self.high_from).map_err(|e| {
            ConfigError::Validation {
                field: "concentration".to_string(),
                message: e.to_string(),
            }
        })
    }

    pub(crate) fn validate_into(&self, errors: &mut Vec<ValidationError>) {
        if self.medium_from <= Decimal::ZERO {
            errors.push(ValidationError::with_rule(
                "concentration.medium_from",
                format!("must be positive, got {}", self.medium_from),
                "positive",
            ));
        }
        if self.high_from <= self.medium_from {
            errors.push(ValidationError::with_rule(
                "concentration.high_from",
                format!(
                    "must exceed medium_from ({}), got {}",
                    self.medium_from, self.high_from
                ),
                "ordered_breakpoints",
            ));
        }
        if self.high_from > HHI_MAX {
            errors.push(ValidationError::with_rule(
                "concentration.high_from",
                format!("must not exceed {HHI_MAX}, got {}", self.high_from),
                "max_hhi",
            ));
        }
    }
}

// =============================================================================
// CURRENCY
// =============================================================================

/// Currency conversion behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySettings {
    /// Handling of exposures whose currency has no rate.
    pub conversion_failure: ConversionFailurePolicy,
    /// Cache successful rates for the converter's lifetime.
    pub cache_enabled: bool,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self {
            conversion_failure: ConversionFailurePolicy::ZeroFallback,
            cache_enabled: true,
        }
    }
}

// =============================================================================
// PROCESSING / STREAMING
// =============================================================================

/// Batch processing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    /// Exposures per chunk between progress updates.
    pub progress_interval: usize,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            progress_interval: 1000,
        }
    }
}

/// Streaming parser observability settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Records between memory samples.
    pub sample_interval: usize,
    /// Memory growth during parsing that triggers a warning.
    pub memory_warn_bytes: u64,
    /// Share of total memory, in percent, that triggers a warning.
    pub memory_warn_percent: f64,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            sample_interval: 1000,
            memory_warn_bytes: 500 * 1024 * 1024,
            memory_warn_percent: 80.0,
        }
    }
}

// =============================================================================
// RETRY / EXECUTOR
// =============================================================================

/// Retry policy for downloads and result storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on any delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetrySettings {
    /// Initial delay as a [`Duration`].
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Maximum delay as a [`Duration`].
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Batch executor limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Batches running on worker tasks at once.
    pub max_concurrent_batches: usize,
    /// Batches waiting for a worker before submitters run them inline.
    pub queue_capacity: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_batches: 3,
            queue_capacity: 50,
        }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classification rule extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    /// Product codes pinned to a sector, matched before the built-in rules.
    pub sector_overrides: BTreeMap<String, EconomicSector>,
}
