//! Riskcalc CLI - Concentration risk analysis from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Process exposure files into result documents
//! riskcalc process june.json july.json --rates rates.json --config riskcalc.toml
//!
//! # Same, as JSON for further processing
//! riskcalc --format json process june.json --rates rates.csv --config riskcalc.toml
//!
//! # Validate a configuration file
//! riskcalc config check riskcalc.toml
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON and CSV output stay parseable
    let default_filter = if cli.quiet { "warn" } else { "info,riskcalc=debug" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.format;

    match cli.command {
        Commands::Process(args) => commands::process::execute(args, format)?,
        Commands::Config(args) => commands::config::execute(args, format)?,
    }

    Ok(())
}
