//! Terminal rendering for batch outcomes and configuration listings.
//!
//! Warnings and errors go to stderr so JSON and CSV on stdout stay parseable.

use colored::Colorize;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::cli::OutputFormat;

/// Prints `rows` as a table, a JSON array, or CSV with a header line.
pub fn print_rows<T: Serialize + Tabled>(data: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(data),
        OutputFormat::Json => print_json(data),
        OutputFormat::Csv => print_csv(data),
    }
}

fn print_table<T: Tabled>(rows: &[T]) -> anyhow::Result<()> {
    if rows.is_empty() {
        println!("Nothing to show.");
        return Ok(());
    }

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()));

    println!("{table}");
    Ok(())
}

/// Pretty-printed JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn print_csv<T: Serialize>(rows: &[T]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
    rows.iter().try_for_each(|row| writer.serialize(row))?;
    writer.flush()?;
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {message}", "✓".green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{} {message}", "✗".red().bold());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {message}", "!".yellow().bold());
}

/// One configuration setting in `config show`.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct KeyValue {
    #[tabled(rename = "Setting")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

pub fn print_header(title: &str) {
    println!("\n{}", title.bold().underline());
}
