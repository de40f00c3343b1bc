//! Config command implementation.
//!
//! Validates engine configuration files and shows the effective settings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use riskcalc_config::{RiskCalculationConfig, Validate, ValidationError};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output::{print_error, print_header, print_json, print_rows, print_success, KeyValue};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate a configuration file
    Check(PathArgs),

    /// Show the effective configuration, defaults included
    Show(PathArgs),
}

/// A configuration file argument.
#[derive(Args, Debug)]
pub struct PathArgs {
    /// Configuration file (TOML)
    pub path: PathBuf,
}

/// Result of a check, as printed in JSON.
#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    path: String,
    valid: bool,
    errors: &'a [ValidationError],
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        ConfigCommand::Check(args) => check(args.path, format),
        ConfigCommand::Show(args) => show(args.path, format),
    }
}

fn check(path: PathBuf, format: OutputFormat) -> Result<()> {
    let config = RiskCalculationConfig::from_file(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let errors = config.validate();

    match format {
        OutputFormat::Json => print_json(&CheckReport {
            path: path.display().to_string(),
            valid: errors.is_empty(),
            errors: &errors,
        })?,
        OutputFormat::Table | OutputFormat::Csv => {
            if errors.is_empty() {
                print_success(&format!("{} is valid", path.display()));
            }
            for error in &errors {
                print_error(&error.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::InvalidConfig {
            path,
            count: errors.len(),
        }
        .into())
    }
}

fn show(path: PathBuf, format: OutputFormat) -> Result<()> {
    let config = RiskCalculationConfig::from_file(&path)
        .with_context(|| format!("reading {}", path.display()))?;

    if format == OutputFormat::Json {
        return print_json(&config);
    }

    let rows = vec![
        KeyValue::new("concentration.medium_from", config.concentration.medium_from),
        KeyValue::new("concentration.high_from", config.concentration.high_from),
        KeyValue::new(
            "currency.conversion_failure",
            format!("{:?}", config.currency.conversion_failure),
        ),
        KeyValue::new("currency.cache_enabled", config.currency.cache_enabled),
        KeyValue::new("analytics.parallel", config.analytics.parallel),
        KeyValue::new("analytics.parallel_threshold", config.analytics.parallel_threshold),
        KeyValue::new("processing.progress_interval", config.processing.progress_interval),
        KeyValue::new("streaming.sample_interval", config.streaming.sample_interval),
        KeyValue::new("streaming.memory_warn_bytes", config.streaming.memory_warn_bytes),
        KeyValue::new("streaming.memory_warn_percent", config.streaming.memory_warn_percent),
        KeyValue::new("retry.max_attempts", config.retry.max_attempts),
        KeyValue::new("retry.initial_delay_ms", config.retry.initial_delay_ms),
        KeyValue::new("retry.max_delay_ms", config.retry.max_delay_ms),
        KeyValue::new("retry.backoff_multiplier", config.retry.backoff_multiplier),
        KeyValue::new("retry.jitter", config.retry.jitter),
        KeyValue::new("executor.max_concurrent_batches", config.executor.max_concurrent_batches),
        KeyValue::new("executor.queue_capacity", config.executor.queue_capacity),
        KeyValue::new(
            "classification.sector_overrides",
            config.classification.sector_overrides.len(),
        ),
    ];

    if format == OutputFormat::Table {
        print_header(&format!("Configuration {}", path.display()));
    }
    print_rows(&rows, format)
}
