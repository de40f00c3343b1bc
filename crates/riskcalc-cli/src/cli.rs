//! Command-line surface of `riskcalc`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::{ConfigArgs, ProcessArgs};

/// Riskcalc - Concentration risk analysis for large-exposure reporting
#[derive(Parser)]
#[command(name = "riskcalc")]
#[command(version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    /// How batch and configuration results are printed on stdout
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Process exposure files and store their calculation results
    Process(ProcessArgs),

    /// Inspect and validate engine configuration files
    Config(ConfigArgs),
}

/// Stdout rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned table with a summary line
    #[default]
    Table,
    /// Full batch reports as a JSON array
    Json,
    /// One row per batch, with a header
    Csv,
}
