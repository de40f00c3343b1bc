//! Riskcalc Configuration Layer
//!
//! This crate loads and validates the configuration of the risk calculation
//! engine. A configuration is a TOML document with one section per concern:
//!
//! - **Concentration**: HHI breakpoints for the MEDIUM and HIGH risk levels
//! - **Currency**: Failure policy for missing exchange rates, rate caching
//! - **Analytics**: When the calculation core switches to parallel execution
//! - **Processing / Streaming**: Progress granularity and memory alerts
//! - **Retry / Executor**: Backoff for I/O and batch concurrency limits
//! - **Classification**: Product codes pinned to a sector
//!
//! The concentration breakpoints have no built-in values and must always be
//! configured.
//!
//! # Example
//!
//! ```rust
//! use riskcalc_config::{RiskCalculationConfig, Validate};
//!
//! let config = RiskCalculationConfig::from_toml_str(
//!     r#"
//!     [concentration]
//!     medium_from = "1500"
//!     high_from = "2500"
//!
//!     [currency]
//!     conversion_failure = "fail_fast"
//!     "#,
//! )
//! .unwrap();
//!
//! config.validate_or_error().unwrap();
//! let thresholds = config.thresholds().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod calculation;
mod error;
mod settings;

pub use calculation::RiskCalculationConfig;
pub use error::{ConfigError, ConfigResult, Validate, ValidationError};
pub use settings::{
    ClassificationSettings, ConcentrationSettings, CurrencySettings, ExecutorSettings,
    ProcessingSettings, RetrySettings, StreamingSettings,
};
