//! Calculation types shared across the analytics modules.

mod config;
mod exposure;

pub use config::AnalyticsConfig;
pub use exposure::{CalculatedExposure, ClassifiedExposure, SkippedExposure};
