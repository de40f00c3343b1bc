//! Processing states of a batch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`PortfolioAnalysis`](super::PortfolioAnalysis).
///
/// COMPLETED and FAILED are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingState {
    /// Registered, not yet started.
    Pending,
    /// Exposures are being processed.
    InProgress,
    /// Results attached.
    Completed,
    /// Terminated with an error.
    Failed,
}

impl ProcessingState {
    /// True for COMPLETED and FAILED.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Completed | ProcessingState::Failed)
    }

    /// Whether a transition from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: ProcessingState) -> bool {
        matches!(
            (self, next),
            (ProcessingState::Pending, ProcessingState::InProgress)
                | (ProcessingState::Pending, ProcessingState::Failed)
                | (ProcessingState::InProgress, ProcessingState::Completed)
                | (ProcessingState::InProgress, ProcessingState::Failed)
        )
    }

    /// Upper-case code.
    pub fn code(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "PENDING",
            ProcessingState::InProgress => "IN_PROGRESS",
            ProcessingState::Completed => "COMPLETED",
            ProcessingState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ProcessingState; 4] = [
        ProcessingState::Pending,
        ProcessingState::InProgress,
        ProcessingState::Completed,
        ProcessingState::Failed,
    ];

    #[test]
    fn test_terminal_states_are_sinks() {
        for from in [ProcessingState::Completed, ProcessingState::Failed] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_allowed_transitions() {
        use ProcessingState::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!InProgress.can_transition_to(InProgress));
    }
}
