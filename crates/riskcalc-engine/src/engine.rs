//! Batch orchestration.
//!
//! [`RiskCalculationEngine`] runs one exposure file from storage URI to
//! stored result document:
//!
//! ```text
//! register ─► download (retry) ─► parse (blocking) ─► start
//!     ─► resolve rates ─► chunked calculation (blocking, progress)
//!     ─► aggregate + HHI ─► store document (retry) ─► complete
//! ```
//!
//! Any failure along the way moves the batch to FAILED with a stable error
//! code. Every batch runs under its own cancellation token, a child of the
//! engine's shutdown token, and inside an `info_span!("batch")`.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = RiskCalculationEngine::new(config, Arc::new(rates), Arc::new(storage))?;
//! let report = engine
//!     .process_batch(BatchRequest::new("B-2024-06", "08081", "file:///data/exposures.json"))
//!     .await?;
//! println!("{:?} {:?}", report.state, report.result_uri);
//! ```

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use riskcalc_config::{RiskCalculationConfig, Validate};
use riskcalc_core::{BankId, BatchId, EurAmount};
use riskcalc_portfolio::{
    AnalysisOutcome, ConcentrationCalculator, ConcentrationIndices, ExposureClassifier,
    ExposurePipeline, PortfolioAnalysis, ProcessingState,
};
use riskcalc_traits::{ExchangeRateProvider, FileStorage};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::converter::CurrencyConverter;
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::executor::{BatchExecutor, BatchHandle};
use crate::memory::{MemoryProbe, SystemMemoryProbe};
use crate::metrics::{BatchMetrics, BatchMetricsSnapshot};
use crate::output::CalculationResultDocument;
use crate::processing::{BatchCalculation, ChunkedCalculation};
use crate::registry::{AnalysisRegistry, AnalysisWriter, BatchStatus};
use crate::runtime::{RetryConfig, RetryFailure};
use crate::streaming::{ParseFailure, ParsedExposureFile, StreamingParser};

// =============================================================================
// REQUEST / REPORT
// =============================================================================

/// One exposure file to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Batch identifier, unique per engine.
    pub batch_id: BatchId,
    /// Submitting bank.
    pub bank_id: BankId,
    /// Storage URI of the exposure file.
    pub source_uri: String,
}

impl BatchRequest {
    /// Creates a request.
    pub fn new(
        batch_id: impl Into<String>,
        bank_id: impl Into<String>,
        source_uri: impl Into<String>,
    ) -> Self {
        Self {
            batch_id: BatchId::new(batch_id),
            bank_id: BankId::new(bank_id),
            source_uri: source_uri.into(),
        }
    }
}

/// Summary of a processed batch, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Batch identifier.
    pub batch_id: BatchId,
    /// Final state: COMPLETED or FAILED.
    pub state: ProcessingState,
    /// Failure code, when FAILED.
    pub error_code: Option<ErrorCode>,
    /// `"<CODE>: <message>"`, when FAILED.
    pub error_message: Option<String>,
    /// Stored result document.
    pub result_uri: Option<String>,
    /// Exposures in the result.
    pub exposures_calculated: usize,
    /// Exposure records left out (parse and policy skips).
    pub records_skipped: usize,
    /// Total net portfolio.
    pub total_amount_eur: Option<EurAmount>,
    /// HHI per taxonomy.
    pub concentration: Option<ConcentrationIndices>,
    /// Download attempts made.
    pub download_attempts: u32,
    /// Storage attempts made.
    pub storage_attempts: u32,
    /// Source bytes parsed.
    pub bytes_processed: u64,
    /// Wall time of the batch.
    pub duration_ms: u64,
}

impl BatchReport {
    fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            state: ProcessingState::Pending,
            error_code: None,
            error_message: None,
            result_uri: None,
            exposures_calculated: 0,
            records_skipped: 0,
            total_amount_eur: None,
            concentration: None,
            download_attempts: 0,
            storage_attempts: 0,
            bytes_processed: 0,
            duration_ms: 0,
        }
    }

    /// True when the batch completed.
    pub fn is_success(&self) -> bool {
        self.state == ProcessingState::Completed
    }
}

// =============================================================================
// ENGINE
// =============================================================================

struct EngineInner {
    config: RiskCalculationConfig,
    calculator: ConcentrationCalculator,
    classifier: ExposureClassifier,
    converter: CurrencyConverter,
    storage: Arc<dyn FileStorage>,
    parser: StreamingParser,
    retry: RetryConfig,
    registry: AnalysisRegistry,
    metrics: BatchMetrics,
    executor: BatchExecutor,
    shutdown: CancellationToken,
    running: DashMap<BatchId, CancellationToken>,
}

/// Runs exposure batches. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct RiskCalculationEngine {
    inner: Arc<EngineInner>,
}

impl RiskCalculationEngine {
    /// Creates an engine sampling memory with [`SystemMemoryProbe`].
    ///
    /// Fails when the configuration does not validate.
    pub fn new(
        config: RiskCalculationConfig,
        rates: Arc<dyn ExchangeRateProvider>,
        storage: Arc<dyn FileStorage>,
    ) -> EngineResult<Self> {
        Self::with_memory_probe(config, rates, storage, Arc::new(SystemMemoryProbe::new()))
    }

    /// Creates an engine with an explicit memory probe.
    pub fn with_memory_probe(
        config: RiskCalculationConfig,
        rates: Arc<dyn ExchangeRateProvider>,
        storage: Arc<dyn FileStorage>,
        probe: Arc<dyn MemoryProbe>,
    ) -> EngineResult<Self> {
        config.validate_or_error()?;
        let calculator = ConcentrationCalculator::new(config.thresholds()?);

        let inner = EngineInner {
            calculator,
            classifier: config.classifier(),
            converter: CurrencyConverter::with_cache(rates, config.currency.cache_enabled),
            storage,
            parser: StreamingParser::new(config.streaming, probe),
            retry: RetryConfig::from(&config.retry),
            registry: AnalysisRegistry::new(),
            metrics: BatchMetrics::default(),
            executor: BatchExecutor::new(&config.executor),
            shutdown: CancellationToken::new(),
            running: DashMap::new(),
            config,
        };
        info!(
            medium_from = %calculator.thresholds().medium_from(),
            high_from = %calculator.thresholds().high_from(),
            policy = ?inner.config.currency.conversion_failure,
            "Risk calculation engine ready"
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &RiskCalculationConfig {
        &self.inner.config
    }

    /// Processes one batch on the current task.
    ///
    /// Batch failures are recorded on the batch and returned as a FAILED
    /// report; `Err` means the batch was refused (duplicate id or engine
    /// shut down) and nothing was recorded.
    pub async fn process_batch(&self, request: BatchRequest) -> EngineResult<BatchReport> {
        if self.inner.shutdown.is_cancelled() {
            return Err(EngineError::Shutdown);
        }
        let writer = self
            .inner
            .registry
            .register(request.batch_id.clone(), request.bank_id.clone())?;

        let cancel = self.inner.shutdown.child_token();
        self.inner
            .running
            .insert(request.batch_id.clone(), cancel.clone());

        let span = info_span!(
            "batch",
            batch_id = %request.batch_id,
            bank_id = %request.bank_id
        );
        let report = self.run(request, writer, cancel).instrument(span).await;
        self.inner.running.remove(&report.batch_id);
        Ok(report)
    }

    /// Submits a batch to the executor.
    ///
    /// When the executor queue is full the batch runs on the calling task
    /// before this returns.
    pub async fn submit_batch(&self, request: BatchRequest) -> BatchHandle<EngineResult<BatchReport>> {
        let engine = self.clone();
        self.inner
            .executor
            .submit(move || async move { engine.process_batch(request).await })
            .await
    }

    /// Cancels a running batch. Returns false when it is not running.
    pub fn cancel_batch(&self, batch_id: &BatchId) -> bool {
        match self.inner.running.get(batch_id) {
            Some(token) => {
                info!(batch_id = %batch_id, "Cancelling batch");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every running batch and refuses new ones.
    pub fn shutdown(&self) {
        info!(running = self.inner.running.len(), "Engine shutting down");
        self.inner.shutdown.cancel();
    }

    /// True once [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Status of one batch.
    pub fn status(&self, batch_id: &BatchId) -> Option<BatchStatus> {
        self.inner.registry.status(batch_id)
    }

    /// Status of every known batch.
    pub fn statuses(&self) -> Vec<BatchStatus> {
        self.inner.registry.statuses()
    }

    /// Copy of a batch's analysis.
    pub fn analysis(&self, batch_id: &BatchId) -> Option<PortfolioAnalysis> {
        self.inner.registry.analysis(batch_id)
    }

    /// Batch counters.
    pub fn metrics(&self) -> BatchMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Number of cached exchange rates.
    pub fn cached_rates(&self) -> usize {
        self.inner.converter.cache_size()
    }

    /// Drops cached exchange rates.
    pub fn clear_rate_cache(&self) {
        self.inner.converter.clear_cache();
    }

    // -------------------------------------------------------------------------
    // Batch execution
    // -------------------------------------------------------------------------

    async fn run(
        &self,
        request: BatchRequest,
        mut writer: AnalysisWriter,
        cancel: CancellationToken,
    ) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::new(request.batch_id.clone());
        self.inner.metrics.record_started();
        info!(source = %request.source_uri, "Batch started");

        let result = self.calculate(&request, &mut writer, &cancel, &mut report).await;
        let elapsed = started.elapsed();
        report.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(outcome) => match writer.complete(outcome) {
                Ok(()) => {
                    report.state = ProcessingState::Completed;
                    self.inner
                        .metrics
                        .record_success(elapsed, report.exposures_calculated);
                    info!(
                        exposures = report.exposures_calculated,
                        skipped = report.records_skipped,
                        duration_ms = report.duration_ms,
                        "Batch completed"
                    );
                }
                Err(e) => self.record_failure(&mut report, None, &e, elapsed),
            },
            Err(e) => self.record_failure(&mut report, Some(writer), &e, elapsed),
        }
        report
    }

    fn record_failure(
        &self,
        report: &mut BatchReport,
        writer: Option<AnalysisWriter>,
        e: &EngineError,
        elapsed: std::time::Duration,
    ) {
        let code = e.code();
        let message = e.to_string();
        if code == ErrorCode::BatchCancelled {
            warn!(error = %message, "Batch cancelled");
        } else {
            error!(code = %code, error = %message, "Batch failed");
        }
        if let Some(writer) = writer {
            if let Err(transition) = writer.fail(code, message.clone()) {
                warn!(error = %transition, "Could not record batch failure");
            }
        }
        report.state = ProcessingState::Failed;
        report.error_code = Some(code);
        report.error_message = Some(format!("{code}: {message}"));
        self.inner.metrics.record_failure(elapsed, code);
    }

    async fn calculate(
        &self,
        request: &BatchRequest,
        writer: &mut AnalysisWriter,
        cancel: &CancellationToken,
        report: &mut BatchReport,
    ) -> EngineResult<AnalysisOutcome> {
        let batch_id = &request.batch_id;

        let content = self.download(request, cancel, report).await?;
        let parsed = self.parse(batch_id, content, cancel).await?;
        report.bytes_processed = parsed.stats.bytes_processed;

        writer.start(parsed.exposures.len())?;

        let rates = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(EngineError::Cancelled(batch_id.clone())),
            rates = self.inner.converter.snapshot(parsed.currencies()) => rates,
        };
        if !rates.failed_currencies().is_empty() {
            warn!(
                currencies = ?rates.failed_currencies(),
                policy = ?self.inner.config.currency.conversion_failure,
                "Some exchange rates are unavailable"
            );
        }

        let mitigations = parsed.mitigations_by_exposure();
        let ParsedExposureFile {
            bank_info,
            exposures: records,
            skipped,
            skipped_mitigations,
            ..
        } = parsed;

        let (progress_tx, mut progress_rx) = watch::channel(0usize);
        let inner = Arc::clone(&self.inner);
        let worker_cancel = cancel.clone();
        let worker_batch = batch_id.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            let pipeline = ExposurePipeline::new(
                &inner.classifier,
                &rates,
                inner.config.currency.conversion_failure,
            );
            ChunkedCalculation::new(
                pipeline,
                inner.calculator,
                &inner.config.analytics,
                inner.config.processing.progress_interval,
            )
            .run(&worker_batch, &records, &mitigations, &worker_cancel, |n| {
                let _ = progress_tx.send(n);
                Ok(())
            })
        });

        let joined = loop {
            tokio::select! {
                biased;
                changed = progress_rx.changed() => match changed {
                    Ok(()) => {
                        let processed = *progress_rx.borrow_and_update();
                        writer.update_progress(processed)?;
                    }
                    Err(_) => break (&mut task).await,
                },
                joined = &mut task => break joined,
            }
        };
        let calculation: BatchCalculation = joined??;
        // the last send can race the join
        let processed = *progress_rx.borrow();
        writer.update_progress(processed)?;

        report.exposures_calculated = calculation.processed.calculated.len();
        report.records_skipped = skipped.len() + calculation.processed.skipped.len();
        report.total_amount_eur = Some(calculation.aggregate.total_portfolio);
        report.concentration = Some(calculation.concentration);

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled(batch_id.clone()));
        }

        let document = CalculationResultDocument::new(
            batch_id.clone(),
            request.bank_id.clone(),
            bank_info.as_ref(),
            &calculation,
            &skipped,
            &skipped_mitigations,
            Utc::now(),
        );
        let uri = self.store(batch_id, &document.to_json()?, cancel, report).await?;
        writer.set_result_uri(uri.clone());
        report.result_uri = Some(uri);

        Ok(AnalysisOutcome {
            aggregate: calculation.aggregate,
            concentration: calculation.concentration,
        })
    }

    async fn download(
        &self,
        request: &BatchRequest,
        cancel: &CancellationToken,
        report: &mut BatchReport,
    ) -> EngineResult<Bytes> {
        let storage = &self.inner.storage;
        let uri = request.source_uri.as_str();
        let retried = self
            .inner
            .retry
            .execute("download", cancel, |attempt| {
                debug!(attempt, uri, "Downloading exposure file");
                storage.download_file_content(uri)
            })
            .await;
        report.download_attempts = retried.attempt_count();

        match retried.result {
            Ok(content) => {
                info!(bytes = content.len(), attempts = report.download_attempts, "Downloaded exposure file");
                Ok(content)
            }
            Err(RetryFailure::Cancelled) => Err(EngineError::Cancelled(request.batch_id.clone())),
            Err(RetryFailure::Exhausted(source) | RetryFailure::Permanent(source)) => {
                Err(EngineError::DownloadFailed {
                    uri: request.source_uri.clone(),
                    attempts: report.download_attempts,
                    source,
                })
            }
        }
    }

    async fn parse(
        &self,
        batch_id: &BatchId,
        content: Bytes,
        cancel: &CancellationToken,
    ) -> EngineResult<ParsedExposureFile> {
        let parser = self.inner.parser.clone();
        let token = cancel.clone();
        let parsed = tokio::task::spawn_blocking(move || parser.parse(&content, &token)).await?;
        match parsed {
            Ok(file) => Ok(file),
            Err(ParseFailure::Cancelled) => Err(EngineError::Cancelled(batch_id.clone())),
            Err(ParseFailure::Structural(message)) => Err(EngineError::ParseError(message)),
        }
    }

    async fn store(
        &self,
        batch_id: &BatchId,
        json: &str,
        cancel: &CancellationToken,
        report: &mut BatchReport,
    ) -> EngineResult<String> {
        let storage = &self.inner.storage;
        let retried = self
            .inner
            .retry
            .execute("store", cancel, |_| storage.store_calculation_results(batch_id, json))
            .await;
        report.storage_attempts = retried.attempt_count();

        match retried.result {
            Ok(uri) => {
                info!(uri = %uri, attempts = report.storage_attempts, "Stored calculation results");
                Ok(uri)
            }
            Err(RetryFailure::Cancelled) => Err(EngineError::Cancelled(batch_id.clone())),
            Err(RetryFailure::Exhausted(source) | RetryFailure::Permanent(source)) => {
                Err(EngineError::StorageFailed {
                    batch_id: batch_id.clone(),
                    attempts: report.storage_attempts,
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for RiskCalculationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskCalculationEngine")
            .field("batches", &self.inner.registry.len())
            .field("running", &self.inner.running.len())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
