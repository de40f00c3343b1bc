//! The portfolio analysis aggregate.

use chrono::{DateTime, Utc};
use riskcalc_core::{BatchId, EurAmount};
use serde::{Deserialize, Serialize};

use super::{ProcessingProgress, ProcessingState};
use crate::bucketing::{GeographicBreakdown, PortfolioAggregate, SectorBreakdown};
use crate::concentration::{ConcentrationIndex, ConcentrationIndices};
use crate::error::{PortfolioError, PortfolioResult};

/// Results attached on completion, all at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Totals and breakdowns.
    pub aggregate: PortfolioAggregate,
    /// HHI per taxonomy.
    pub concentration: ConcentrationIndices,
}

/// Why a batch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    /// Stable error code, e.g. `FILE_PARSING_ERROR`.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

/// One batch's analysis: lifecycle state, progress and final results.
///
/// Transitions are the only mutators. Results exist only in COMPLETED and
/// the failure only in FAILED. Each transition has an `_at` variant taking
/// the clock explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    batch_id: BatchId,
    state: ProcessingState,
    progress: Option<ProcessingProgress>,
    outcome: Option<AnalysisOutcome>,
    failure: Option<AnalysisFailure>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    analyzed_at: Option<DateTime<Utc>>,
    last_updated_at: DateTime<Utc>,
}

impl PortfolioAnalysis {
    /// A new analysis in PENDING.
    #[must_use]
    pub fn new(batch_id: BatchId) -> Self {
        Self::new_at(batch_id, Utc::now())
    }

    /// [`PortfolioAnalysis::new`] with an explicit clock.
    #[must_use]
    pub fn new_at(batch_id: BatchId, now: DateTime<Utc>) -> Self {
        Self {
            batch_id,
            state: ProcessingState::Pending,
            progress: None,
            outcome: None,
            failure: None,
            created_at: now,
            started_at: None,
            analyzed_at: None,
            last_updated_at: now,
        }
    }

    fn transition(&mut self, next: ProcessingState, action: &str) -> PortfolioResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(PortfolioError::invalid_transition(
                self.batch_id.as_str(),
                self.state,
                action,
            ));
        }
        self.state = next;
        Ok(())
    }

    /// PENDING -> IN_PROGRESS with the number of exposures to process.
    pub fn start(&mut self, total_exposures: usize) -> PortfolioResult<()> {
        self.start_at(total_exposures, Utc::now())
    }

    /// [`PortfolioAnalysis::start`] with an explicit clock.
    pub fn start_at(&mut self, total_exposures: usize, now: DateTime<Utc>) -> PortfolioResult<()> {
        self.transition(ProcessingState::InProgress, "start")?;
        self.progress = Some(ProcessingProgress::new(total_exposures, now));
        self.started_at = Some(now);
        self.last_updated_at = now;
        Ok(())
    }

    /// Records progress. Only valid while IN_PROGRESS.
    pub fn update_progress(&mut self, processed: usize) -> PortfolioResult<()> {
        self.update_progress_at(processed, Utc::now())
    }

    /// [`PortfolioAnalysis::update_progress`] with an explicit clock.
    pub fn update_progress_at(&mut self, processed: usize, now: DateTime<Utc>) -> PortfolioResult<()> {
        let progress = match (self.state, self.progress.as_mut()) {
            (ProcessingState::InProgress, Some(progress)) => progress,
            _ => {
                return Err(PortfolioError::invalid_transition(
                    self.batch_id.as_str(),
                    self.state,
                    "update progress",
                ))
            }
        };
        progress.update(processed, now)?;
        self.last_updated_at = now;
        Ok(())
    }

    /// IN_PROGRESS -> COMPLETED, attaching the results.
    pub fn complete(&mut self, outcome: AnalysisOutcome) -> PortfolioResult<()> {
        self.complete_at(outcome, Utc::now())
    }

    /// [`PortfolioAnalysis::complete`] with an explicit clock.
    pub fn complete_at(&mut self, outcome: AnalysisOutcome, now: DateTime<Utc>) -> PortfolioResult<()> {
        self.transition(ProcessingState::Completed, "complete")?;
        if let Some(progress) = self.progress.as_mut() {
            let total = progress.total_exposures();
            progress.update(total, now)?;
        }
        self.outcome = Some(outcome);
        self.analyzed_at = Some(now);
        self.last_updated_at = now;
        Ok(())
    }

    /// PENDING or IN_PROGRESS -> FAILED.
    pub fn fail(&mut self, code: impl Into<String>, message: impl Into<String>) -> PortfolioResult<()> {
        self.fail_at(code, message, Utc::now())
    }

    /// [`PortfolioAnalysis::fail`] with an explicit clock.
    pub fn fail_at(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> PortfolioResult<()> {
        self.transition(ProcessingState::Failed, "fail")?;
        self.failure = Some(AnalysisFailure {
            code: code.into(),
            message: message.into(),
        });
        self.last_updated_at = now;
        Ok(())
    }

    /// Batch identifier.
    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    /// Current state.
    pub fn state(&self) -> ProcessingState {
        self.state
    }

    /// Progress, once started.
    pub fn progress(&self) -> Option<&ProcessingProgress> {
        self.progress.as_ref()
    }

    /// Results, once COMPLETED.
    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    /// Failure details, once FAILED.
    pub fn failure(&self) -> Option<&AnalysisFailure> {
        self.failure.as_ref()
    }

    /// `"<CODE>: <message>"`, once FAILED.
    pub fn error_message(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|f| format!("{}: {}", f.code, f.message))
    }

    /// Total net portfolio, once COMPLETED.
    pub fn total_portfolio(&self) -> Option<EurAmount> {
        self.outcome.as_ref().map(|o| o.aggregate.total_portfolio)
    }

    /// Geographic breakdown, once COMPLETED.
    pub fn geographic_breakdown(&self) -> Option<&GeographicBreakdown> {
        self.outcome.as_ref().map(|o| &o.aggregate.geographic)
    }

    /// Sector breakdown, once COMPLETED.
    pub fn sector_breakdown(&self) -> Option<&SectorBreakdown> {
        self.outcome.as_ref().map(|o| &o.aggregate.sector)
    }

    /// Geographic HHI, once COMPLETED.
    pub fn geographic_hhi(&self) -> Option<ConcentrationIndex> {
        self.outcome.as_ref().map(|o| o.concentration.geographic)
    }

    /// Sector HHI, once COMPLETED.
    pub fn sector_hhi(&self) -> Option<ConcentrationIndex> {
        self.outcome.as_ref().map(|o| o.concentration.sector)
    }

    /// When the analysis was registered.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When processing started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When results were attached.
    pub fn analyzed_at(&self) -> Option<DateTime<Utc>> {
        self.analyzed_at
    }

    /// Time of the last mutation.
    pub fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }
}
