//! Batch counters and durations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Collects batch outcomes for the engine.
#[derive(Debug)]
pub struct BatchMetrics {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    exposures_processed: AtomicU64,
    /// Durations of finished batches in milliseconds (circular buffer).
    durations: Mutex<VecDeque<u64>>,
    max_samples: usize,
}

impl BatchMetrics {
    /// Creates a collector keeping the last `max_samples` durations.
    pub fn new(max_samples: usize) -> Self {
        Self {
            started: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            exposures_processed: AtomicU64::new(0),
            durations: Mutex::new(VecDeque::with_capacity(max_samples)),
            max_samples: max_samples.max(1),
        }
    }

    /// A batch entered processing.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// A batch completed.
    pub fn record_success(&self, duration: Duration, exposures: usize) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.exposures_processed
            .fetch_add(exposures as u64, Ordering::Relaxed);
        self.record_duration(duration);
    }

    /// A batch failed with `code`.
    pub fn record_failure(&self, duration: Duration, code: ErrorCode) {
        if code == ErrorCode::BatchCancelled {
            self.cancelled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.record_duration(duration);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn record_duration(&self, duration: Duration) {
        let mut durations = self.durations.lock();
        if durations.len() >= self.max_samples {
            durations.pop_front();
        }
        durations.push_back(duration.as_millis() as u64);
    }

    /// Current counters and duration statistics.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn snapshot(&self) -> BatchMetricsSnapshot {
        let durations = self.durations.lock();
        let (avg_duration_ms, max_duration_ms, p95_duration_ms) = if durations.is_empty() {
            (0, 0, 0)
        } else {
            let mut sorted: Vec<_> = durations.iter().copied().collect();
            sorted.sort_unstable();
            let avg = sorted.iter().sum::<u64>() / sorted.len() as u64;
            let p95_idx = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);
            let max = sorted.last().copied().unwrap_or(0);
            (avg, max, sorted[p95_idx])
        };

        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let cancelled = self.cancelled.load(Ordering::Relaxed);
        let finished = succeeded + failed + cancelled;

        BatchMetricsSnapshot {
            batches_started: self.started.load(Ordering::Relaxed),
            batches_succeeded: succeeded,
            batches_failed: failed,
            batches_cancelled: cancelled,
            exposures_processed: self.exposures_processed.load(Ordering::Relaxed),
            failure_rate: if finished > 0 {
                (failed + cancelled) as f64 / finished as f64
            } else {
                0.0
            },
            avg_duration_ms,
            p95_duration_ms,
            max_duration_ms,
        }
    }
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Snapshot of batch metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetricsSnapshot {
    /// Batches that entered processing.
    pub batches_started: u64,
    /// Batches that completed.
    pub batches_succeeded: u64,
    /// Batches that failed for reasons other than cancellation.
    pub batches_failed: u64,
    /// Batches that were cancelled.
    pub batches_cancelled: u64,
    /// Exposures across completed batches.
    pub exposures_processed: u64,
    /// Failed and cancelled over finished (0.0 to 1.0).
    pub failure_rate: f64,
    /// Mean batch duration.
    pub avg_duration_ms: u64,
    /// 95th percentile batch duration.
    pub p95_duration_ms: u64,
    /// Longest batch duration.
    pub max_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_metrics() {
        let metrics = BatchMetrics::new(100);
        metrics.record_started();
        metrics.record_started();
        metrics.record_started();
        metrics.record_success(Duration::from_millis(100), 10);
        metrics.record_success(Duration::from_millis(300), 5);
        metrics.record_failure(Duration::from_millis(20), ErrorCode::BatchCancelled);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_started, 3);
        assert_eq!(snapshot.batches_succeeded, 2);
        assert_eq!(snapshot.batches_cancelled, 1);
        assert_eq!(snapshot.batches_failed, 0);
        assert_eq!(snapshot.exposures_processed, 15);
        assert_eq!(snapshot.avg_duration_ms, 140);
        assert_eq!(snapshot.max_duration_ms, 300);
        assert!((snapshot.failure_rate - 0.333).abs() < 0.01);
    }

    #[test]
    fn test_duration_buffer_is_bounded() {
        let metrics = BatchMetrics::new(2);
        for ms in [1000, 10, 20] {
            metrics.record_success(Duration::from_millis(ms), 1);
        }
        assert_eq!(metrics.snapshot().max_duration_ms, 20);
    }
}
