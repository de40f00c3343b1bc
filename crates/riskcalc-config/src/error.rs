//! Errors raised while loading and checking engine configuration.

use serde::Serialize;
use thiserror::Error;

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why a configuration could not be loaded or accepted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for this schema.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The configuration could not be rendered back to TOML.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Exactly one setting is out of range.
    #[error("Validation error: {field}: {message}")]
    Validation {
        /// Dotted setting path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several settings are out of range; all of them are listed.
    #[error("Multiple validation errors: {}", join_errors(.0))]
    MultipleValidationErrors(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Deserialization(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Serialization(err.to_string())
    }
}

/// One rejected setting, as reported by `riskcalc config check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Field that failed validation, as a dotted path.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
    /// Short rule name such as `positive` or `ordered`.
    pub rule: Option<String>,
}

impl ValidationError {
    /// A rejection without a rule name.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// A rejection tagged with the rule it broke.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref rule) = self.rule {
            write!(f, "{}: {} (rule: {})", self.field, self.message, rule)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Settings sections that can check their own ranges.
pub trait Validate {
    /// Every problem found; empty when the section is usable.
    fn validate(&self) -> Vec<ValidationError>;

    /// No problems found.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Collapses [`Validate::validate`] into a single error value.
    fn validate_or_error(&self) -> ConfigResult<()> {
        let mut errors = self.validate();
        match errors.len() {
            0 => Ok(()),
            1 => {
                let err = errors.remove(0);
                Err(ConfigError::Validation {
                    field: err.field,
                    message: err.message,
                })
            }
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(Vec<ValidationError>);

    impl Validate for Always {
        fn validate(&self) -> Vec<ValidationError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_validate_or_error_shapes() {
        assert!(Always(vec![]).validate_or_error().is_ok());

        let one = Always(vec![ValidationError::new("retry.max_attempts", "must be at least 1")]);
        match one.validate_or_error() {
            Err(ConfigError::Validation { field, .. }) => assert_eq!(field, "retry.max_attempts"),
            other => panic!("unexpected {other:?}"),
        }

        let two = Always(vec![
            ValidationError::new("a", "bad"),
            ValidationError::with_rule("b", "worse", "positive"),
        ]);
        let err = two.validate_or_error().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Multiple validation errors: a: bad; b: worse (rule: positive)"
        );
    }
}
