//! Top-level risk calculation configuration.

use std::path::Path;

use riskcalc_portfolio::{AnalyticsConfig, ConcentrationThresholds, ExposureClassifier};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, Validate, ValidationError};
use crate::settings::{
    ClassificationSettings, ConcentrationSettings, CurrencySettings, ExecutorSettings,
    ProcessingSettings, RetrySettings, StreamingSettings,
};

/// Complete engine configuration, usually loaded from TOML.
///
/// ```rust
/// use riskcalc_config::{RiskCalculationConfig, Validate};
///
/// let config = RiskCalculationConfig::from_toml_str(
///     r#"
///     [concentration]
///     medium_from = "1500"
///     high_from = "2500"
///     "#,
/// )
/// .unwrap();
/// assert!(config.is_valid());
/// assert_eq!(config.retry.max_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCalculationConfig {
    /// HHI breakpoints. Required.
    pub concentration: ConcentrationSettings,
    /// Currency conversion behavior.
    #[serde(default)]
    pub currency: CurrencySettings,
    /// Parallelism of the calculation core.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Chunking and progress reporting.
    #[serde(default)]
    pub processing: ProcessingSettings,
    /// Streaming parser observability.
    #[serde(default)]
    pub streaming: StreamingSettings,
    /// Download and storage retries.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Batch executor limits.
    #[serde(default)]
    pub executor: ExecutorSettings,
    /// Classification rule extensions.
    #[serde(default)]
    pub classification: ClassificationSettings,
}

impl RiskCalculationConfig {
    /// A configuration with the given breakpoints and defaults elsewhere.
    #[must_use]
    pub fn with_concentration(concentration: ConcentrationSettings) -> Self {
        Self {
            concentration,
            currency: CurrencySettings::default(),
            analytics: AnalyticsConfig::default(),
            processing: ProcessingSettings::default(),
            streaming: StreamingSettings::default(),
            retry: RetrySettings::default(),
            executor: ExecutorSettings::default(),
            classification: ClassificationSettings::default(),
        }
    }

    /// Parses TOML text. Does not validate.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a TOML file. Does not validate.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let config = Self::from_file(path)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validated HHI thresholds.
    pub fn thresholds(&self) -> ConfigResult<ConcentrationThresholds> {
        self.concentration.thresholds()
    }

    /// Classifier with the configured sector overrides.
    pub fn classifier(&self) -> ExposureClassifier {
        ExposureClassifier::new().with_sector_overrides(&self.classification.sector_overrides)
    }
}

impl Validate for RiskCalculationConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        self.concentration.validate_into(&mut errors);

        if self.analytics.parallel_threshold == 0 {
            errors.push(ValidationError::with_rule(
                "analytics.parallel_threshold",
                "Parallel threshold must be at least 1",
                "positive",
            ));
        }

        if self.processing.progress_interval == 0 {
            errors.push(ValidationError::with_rule(
                "processing.progress_interval",
                "Progress interval must be at least 1",
                "positive",
            ));
        }

        if self.streaming.sample_interval == 0 {
            errors.push(ValidationError::with_rule(
                "streaming.sample_interval",
                "Sample interval must be at least 1",
                "positive",
            ));
        }
        if !(self.streaming.memory_warn_percent > 0.0 && self.streaming.memory_warn_percent <= 100.0)
        {
            errors.push(ValidationError::with_rule(
                "streaming.memory_warn_percent",
                "Memory warning percent must be in (0, 100]",
                "valid_percent",
            ));
        }

        if self.retry.max_attempts == 0 || self.retry.max_attempts > 20 {
            errors.push(ValidationError::with_rule(
                "retry.max_attempts",
                "Max attempts must be between 1 and 20",
                "valid_attempts",
            ));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            errors.push(ValidationError::with_rule(
                "retry.max_delay_ms",
                "Max delay cannot be below the initial delay",
                "ordered_delays",
            ));
        }
        if !(self.retry.backoff_multiplier >= 1.0 && self.retry.backoff_multiplier.is_finite()) {
            errors.push(ValidationError::with_rule(
                "retry.backoff_multiplier",
                "Backoff multiplier must be a finite value of at least 1.0",
                "valid_multiplier",
            ));
        }

        if self.executor.max_concurrent_batches == 0 {
            errors.push(ValidationError::with_rule(
                "executor.max_concurrent_batches",
                "At least one concurrent batch is required",
                "positive",
            ));
        }

        for product in self.classification.sector_overrides.keys() {
            if product.trim().is_empty() {
                errors.push(ValidationError::new(
                    "classification.sector_overrides",
                    "Override keys cannot be blank",
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcalc_core::EconomicSector;
    use riskcalc_portfolio::{ConversionFailurePolicy, RiskLevel};
    use rust_decimal_macros::dec;
    use std::io::Write;

    const FULL: &str = r#"
        [concentration]
        medium_from = "1500"
        high_from = "2500"

        [currency]
        conversion_failure = "skip_record"
        cache_enabled = false

        [analytics]
        parallel = false
        parallel_threshold = 500

        [processing]
        progress_interval = 250

        [streaming]
        sample_interval = 5000
        memory_warn_bytes = 1048576
        memory_warn_percent = 90.0

        [retry]
        max_attempts = 5
        initial_delay_ms = 200
        max_delay_ms = 5000
        backoff_multiplier = 1.5
        jitter = false

        [executor]
        max_concurrent_batches = 8
        queue_capacity = 16

        [classification.sector_overrides]
        "HOUSE LOAN PLUS" = "RETAIL_MORTGAGE"
        TREASURY_REPO = "BANKING"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = RiskCalculationConfig::from_toml_str(
            "[concentration]\nmedium_from = \"1000\"\nhigh_from = \"1800\"\n",
        )
        .unwrap();

        assert!(config.is_valid());
        assert_eq!(config.concentration.medium_from, dec!(1000));
        assert_eq!(config.currency.conversion_failure, ConversionFailurePolicy::ZeroFallback);
        assert!(config.currency.cache_enabled);
        assert_eq!(config.processing.progress_interval, 1000);
        assert_eq!(config.executor.max_concurrent_batches, 3);
        assert!(config.classification.sector_overrides.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = RiskCalculationConfig::from_toml_str(FULL).unwrap();
        assert!(config.is_valid(), "{:?}", config.validate());

        assert_eq!(config.currency.conversion_failure, ConversionFailurePolicy::SkipRecord);
        assert!(!config.analytics.parallel);
        assert_eq!(config.analytics.parallel_threshold, 500);
        assert_eq!(config.retry.max_attempts, 5);
        assert!(!config.retry.jitter);
        assert_eq!(config.executor.queue_capacity, 16);

        let thresholds = config.thresholds().unwrap();
        assert_eq!(thresholds.classify(dec!(2000)), RiskLevel::Medium);

        let classifier = config.classifier();
        assert_eq!(classifier.classify_sector("house loan plus"), EconomicSector::RetailMortgage);
        assert_eq!(classifier.classify_sector("TREASURY_REPO"), EconomicSector::Banking);
    }

    #[test]
    fn test_concentration_is_required() {
        let err = RiskCalculationConfig::from_toml_str("[retry]\nmax_attempts = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Deserialization(_)));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = RiskCalculationConfig::from_toml_str(
            "[concentration]\nmedium_from = \"1\"\nhigh_from = \"2\"\n[currency]\nconversion_failure = \"ignore\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Deserialization(_)));
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let mut config = RiskCalculationConfig::from_toml_str(FULL).unwrap();
        config.concentration.high_from = dec!(1000);
        config.retry.max_attempts = 0;
        config.executor.max_concurrent_batches = 0;

        let errors = config.validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "concentration.high_from",
                "retry.max_attempts",
                "executor.max_concurrent_batches"
            ]
        );
        assert!(matches!(
            config.validate_or_error(),
            Err(ConfigError::MultipleValidationErrors(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = RiskCalculationConfig::load(file.path()).unwrap();
        assert_eq!(config.processing.progress_interval, 250);

        let missing = RiskCalculationConfig::load("/definitely/not/here.toml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RiskCalculationConfig::from_toml_str(FULL).unwrap();
        let text = config.to_toml_string().unwrap();
        let back = RiskCalculationConfig::from_toml_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
