//! Batch registry and status projections.
//!
//! Every batch's [`PortfolioAnalysis`] lives here. Mutation goes through the
//! single [`AnalysisWriter`] handed out at registration, which the batch's
//! processing task owns; everyone else gets read-only [`BatchStatus`]
//! projections.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::RwLock;
use riskcalc_core::{BankId, BatchId};
use riskcalc_portfolio::{AnalysisOutcome, PortfolioAnalysis, ProcessingState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug)]
struct Entry {
    analysis: PortfolioAnalysis,
    bank_id: BankId,
    result_uri: Option<String>,
}

/// Shared map of batch analyses.
#[derive(Debug, Default)]
pub struct AnalysisRegistry {
    entries: DashMap<BatchId, Arc<RwLock<Entry>>>,
}

impl AnalysisRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a batch in PENDING and returns its only writer.
    ///
    /// A batch id that is already known is rejected with
    /// [`EngineError::DuplicateBatch`]; the existing analysis is untouched.
    pub fn register(&self, batch_id: BatchId, bank_id: BankId) -> EngineResult<AnalysisWriter> {
        match self.entries.entry(batch_id.clone()) {
            MapEntry::Occupied(_) => Err(EngineError::DuplicateBatch(batch_id)),
            MapEntry::Vacant(slot) => {
                let entry = Arc::new(RwLock::new(Entry {
                    analysis: PortfolioAnalysis::new(batch_id.clone()),
                    bank_id,
                    result_uri: None,
                }));
                slot.insert(Arc::clone(&entry));
                Ok(AnalysisWriter { batch_id, entry })
            }
        }
    }

    /// Status of one batch.
    pub fn status(&self, batch_id: &BatchId) -> Option<BatchStatus> {
        let entry = self.entries.get(batch_id)?;
        let status = BatchStatus::from_entry(&entry.read());
        Some(status)
    }

    /// Copy of one batch's analysis.
    pub fn analysis(&self, batch_id: &BatchId) -> Option<PortfolioAnalysis> {
        let entry = self.entries.get(batch_id)?;
        let analysis = entry.read().analysis.clone();
        Some(analysis)
    }

    /// Status of every batch, oldest first.
    pub fn statuses(&self) -> Vec<BatchStatus> {
        let mut all: Vec<BatchStatus> = self
            .entries
            .iter()
            .map(|e| {
                let entry = e.value().read();
                BatchStatus::from_entry(&entry)
            })
            .collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.batch_id.cmp(&b.batch_id))
        });
        all
    }

    /// Drops a finished batch. Running batches are kept.
    pub fn remove_terminal(&self, batch_id: &BatchId) -> Option<PortfolioAnalysis> {
        self.entries
            .remove_if(batch_id, |_, e| e.read().analysis.state().is_terminal())
            .map(|(_, e)| {
                let analysis = e.read().analysis.clone();
                analysis
            })
    }

    /// Number of registered batches.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no batch is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// WRITER
// =============================================================================

/// Exclusive mutation handle for one batch.
///
/// Not `Clone`: whoever holds it is the batch's only writer. Dropping a
/// writer whose batch has not reached a terminal state fails the batch, so
/// a panicking or abandoned worker never leaves it IN_PROGRESS.
#[derive(Debug)]
pub struct AnalysisWriter {
    batch_id: BatchId,
    entry: Arc<RwLock<Entry>>,
}

impl AnalysisWriter {
    /// Batch this writer owns.
    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    /// Current state.
    pub fn state(&self) -> ProcessingState {
        self.entry.read().analysis.state()
    }

    /// PENDING -> IN_PROGRESS.
    pub fn start(&mut self, total_exposures: usize) -> EngineResult<()> {
        self.entry.write().analysis.start(total_exposures)?;
        Ok(())
    }

    /// Records exposures processed so far.
    pub fn update_progress(&mut self, processed: usize) -> EngineResult<()> {
        self.entry.write().analysis.update_progress(processed)?;
        Ok(())
    }

    /// Records where the result document was stored.
    pub fn set_result_uri(&mut self, uri: impl Into<String>) {
        self.entry.write().result_uri = Some(uri.into());
    }

    /// IN_PROGRESS -> COMPLETED with all results at once.
    pub fn complete(self, outcome: AnalysisOutcome) -> EngineResult<()> {
        self.entry.write().analysis.complete(outcome)?;
        Ok(())
    }

    /// PENDING or IN_PROGRESS -> FAILED.
    pub fn fail(self, code: ErrorCode, message: impl Into<String>) -> EngineResult<()> {
        self.entry.write().analysis.fail(code.as_str(), message)?;
        Ok(())
    }
}

impl Drop for AnalysisWriter {
    fn drop(&mut self) {
        let mut entry = self.entry.write();
        if entry.analysis.state().is_terminal() {
            return;
        }
        warn!(batch_id = %self.batch_id, "Batch writer dropped before a terminal state");
        // PENDING and IN_PROGRESS can always fail
        let _ = entry.analysis.fail(
            ErrorCode::CalculationFailed.as_str(),
            "batch worker stopped before completion",
        );
    }
}

// =============================================================================
// STATUS PROJECTION
// =============================================================================

/// Read-only view of a batch for status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    /// Batch identifier.
    pub batch_id: BatchId,
    /// Submitting bank.
    pub bank_id: BankId,
    /// Lifecycle state.
    pub state: ProcessingState,
    /// Exposures announced, once started.
    pub total_exposures: Option<usize>,
    /// Exposures processed, once started.
    pub processed_exposures: Option<usize>,
    /// Completion on the 0-100 scale.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub percentage_complete: Option<Decimal>,
    /// Exposures per second.
    pub processing_rate: Option<f64>,
    /// Estimated milliseconds remaining, while the rate is positive.
    pub estimated_time_remaining_ms: Option<i64>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Processing start.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time.
    pub analyzed_at: Option<DateTime<Utc>>,
    /// Last mutation.
    pub last_updated_at: DateTime<Utc>,
    /// True once results are attached.
    pub has_portfolio_analysis: bool,
    /// `"<CODE>: <message>"` when FAILED.
    pub error_message: Option<String>,
    /// Stored result document, when written.
    pub result_uri: Option<String>,
}

impl BatchStatus {
    fn from_entry(entry: &Entry) -> Self {
        let analysis = &entry.analysis;
        let progress = analysis.progress();
        Self {
            batch_id: analysis.batch_id().clone(),
            bank_id: entry.bank_id.clone(),
            state: analysis.state(),
            total_exposures: progress.map(|p| p.total_exposures()),
            processed_exposures: progress.map(|p| p.processed_exposures()),
            percentage_complete: progress.map(|p| p.percentage_complete()),
            processing_rate: progress.map(|p| p.processing_rate()),
            estimated_time_remaining_ms: progress
                .and_then(|p| p.estimated_time_remaining())
                .map(|d| d.num_milliseconds()),
            created_at: analysis.created_at(),
            started_at: analysis.started_at(),
            analyzed_at: analysis.analyzed_at(),
            last_updated_at: analysis.last_updated_at(),
            has_portfolio_analysis: analysis.outcome().is_some(),
            error_message: analysis.error_message(),
            result_uri: entry.result_uri.clone(),
        }
    }

    /// True for COMPLETED and FAILED.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
