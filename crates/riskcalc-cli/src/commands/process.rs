//! Process command implementation.
//!
//! Runs each exposure file as one batch through the engine's executor and
//! stores the result documents under the output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tracing::{info, warn};

use riskcalc_config::RiskCalculationConfig;
use riskcalc_engine::{BatchReport, BatchRequest, RiskCalculationEngine, RiskCalculationEngineBuilder};
use riskcalc_ext_file::{load_exchange_rates, LocalFileStorage};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output::{print_header, print_json, print_rows, print_success, print_warning};

/// Arguments for the process command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Exposure files (JSON) to process, one batch each
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Exchange rates into EUR (.json or .csv)
    #[arg(short, long, env = "RISKCALC_RATES")]
    pub rates: PathBuf,

    /// Engine configuration (TOML)
    #[arg(short, long, env = "RISKCALC_CONFIG")]
    pub config: PathBuf,

    /// Directory receiving one result folder per batch
    #[arg(short, long, default_value = "riskcalc-results")]
    pub output_dir: PathBuf,

    /// Reporting bank identifier (ABI code)
    #[arg(long, default_value = "UNKNOWN")]
    pub bank_id: String,
}

/// Outcome of one input file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileOutcome {
    file: String,
    #[serde(flatten)]
    report: Option<BatchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refused: Option<String>,
}

impl FileOutcome {
    fn succeeded(&self) -> bool {
        self.report.as_ref().is_some_and(BatchReport::is_success)
    }
}

/// One table or CSV row.
#[derive(Debug, Serialize, Tabled)]
struct BatchRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Batch")]
    batch_id: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Exposures")]
    exposures: String,
    #[tabled(rename = "Skipped")]
    skipped: String,
    #[tabled(rename = "Total EUR")]
    total_eur: String,
    #[tabled(rename = "HHI Geo")]
    hhi_geographic: String,
    #[tabled(rename = "Geo Risk")]
    geographic_risk: String,
    #[tabled(rename = "HHI Sector")]
    hhi_sector: String,
    #[tabled(rename = "Sector Risk")]
    sector_risk: String,
    #[tabled(rename = "Result / Error")]
    detail: String,
}

impl From<&FileOutcome> for BatchRow {
    fn from(outcome: &FileOutcome) -> Self {
        let Some(report) = &outcome.report else {
            return Self {
                file: outcome.file.clone(),
                batch_id: String::new(),
                state: "REFUSED".into(),
                exposures: String::new(),
                skipped: String::new(),
                total_eur: String::new(),
                hhi_geographic: String::new(),
                geographic_risk: String::new(),
                hhi_sector: String::new(),
                sector_risk: String::new(),
                detail: outcome.refused.clone().unwrap_or_default(),
            };
        };
        let text = |v: Option<String>| v.unwrap_or_else(|| "-".into());
        Self {
            file: outcome.file.clone(),
            batch_id: report.batch_id.to_string(),
            state: report.state.to_string(),
            exposures: report.exposures_calculated.to_string(),
            skipped: report.records_skipped.to_string(),
            total_eur: text(report.total_amount_eur.map(|a| a.to_string())),
            hhi_geographic: text(report.concentration.map(|c| c.geographic.value.to_string())),
            geographic_risk: text(report.concentration.map(|c| c.geographic.level.to_string())),
            hhi_sector: text(report.concentration.map(|c| c.sector.value.to_string())),
            sector_risk: text(report.concentration.map(|c| c.sector.level.to_string())),
            detail: report
                .result_uri
                .clone()
                .or_else(|| report.error_message.clone())
                .unwrap_or_default(),
        }
    }
}

/// Execute the process command.
pub fn execute(args: ProcessArgs, format: OutputFormat) -> Result<()> {
    let files = args
        .files
        .iter()
        .map(|f| absolute(f))
        .collect::<Result<Vec<_>>>()?;

    let config = RiskCalculationConfig::load(&args.config)
        .with_context(|| format!("loading configuration {}", args.config.display()))?;
    let rates = load_exchange_rates(&args.rates)
        .with_context(|| format!("loading exchange rates {}", args.rates.display()))?;
    let storage = Arc::new(LocalFileStorage::new(&args.output_dir));

    let engine = RiskCalculationEngineBuilder::new()
        .with_config(config)
        .with_rates(rates)
        .with_storage(storage)
        .build()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let outcomes = runtime.block_on(run_batches(&engine, &files, &args.bank_id));

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    match format {
        OutputFormat::Json => print_json(&outcomes)?,
        OutputFormat::Table => {
            print_header("Batches");
            let rows: Vec<BatchRow> = outcomes.iter().map(BatchRow::from).collect();
            print_rows(&rows, format)?;
            let metrics = engine.metrics();
            if failed == 0 {
                print_success(&format!(
                    "{} batch(es) completed, {} exposures",
                    metrics.batches_succeeded, metrics.exposures_processed
                ));
            } else {
                print_warning(&format!(
                    "{} completed, {} failed, {} cancelled",
                    metrics.batches_succeeded, metrics.batches_failed, metrics.batches_cancelled
                ));
            }
        }
        OutputFormat::Csv => {
            let rows: Vec<BatchRow> = outcomes.iter().map(BatchRow::from).collect();
            print_rows(&rows, format)?;
        }
    }

    if failed > 0 {
        return Err(CliError::BatchesFailed {
            failed,
            total: outcomes.len(),
        }
        .into());
    }
    Ok(())
}

async fn run_batches(
    engine: &RiskCalculationEngine,
    files: &[PathBuf],
    bank_id: &str,
) -> Vec<FileOutcome> {
    let interrupt = engine.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running batches");
            interrupt.shutdown();
        }
    });

    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        let request = BatchRequest::new(batch_id_for(file), bank_id, file_uri(file));
        info!(file = %file.display(), batch_id = %request.batch_id, "Submitting batch");
        handles.push((file, engine.submit_batch(request).await));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (file, handle) in handles {
        let (report, refused) = match handle.join().await {
            Ok(Ok(report)) => (Some(report), None),
            Ok(Err(e)) => (None, Some(format!("{}: {e}", e.code()))),
            Err(e) => (None, Some(e.to_string())),
        };
        outcomes.push(FileOutcome {
            file: file.display().to_string(),
            report,
            refused,
        });
    }

    watcher.abort();
    outcomes
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(CliError::MissingInput(path.to_path_buf()).into());
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// `<file stem>-<8 hex digits>`, unique per run.
fn batch_id_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "batch".into());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{stem}-{}", &suffix[..8])
}
