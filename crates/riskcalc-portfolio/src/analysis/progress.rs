//! Processing progress of a running batch.

use chrono::{DateTime, Duration, Utc};
use riskcalc_core::round_half_up;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, PortfolioResult};

/// Counts and timestamps of a batch in progress.
///
/// Derived figures use `last_update_at` as "now", so they are stable
/// between updates and reproducible in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingProgress {
    total_exposures: usize,
    processed_exposures: usize,
    started_at: DateTime<Utc>,
    last_update_at: DateTime<Utc>,
}

impl ProcessingProgress {
    /// Progress at zero processed.
    #[must_use]
    pub fn new(total_exposures: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            total_exposures,
            processed_exposures: 0,
            started_at,
            last_update_at: started_at,
        }
    }

    /// Records `processed` exposures done as of `at`.
    pub fn update(&mut self, processed: usize, at: DateTime<Utc>) -> PortfolioResult<()> {
        if processed > self.total_exposures {
            return Err(PortfolioError::ProgressExceedsTotal {
                processed,
                total: self.total_exposures,
            });
        }
        self.processed_exposures = processed;
        self.last_update_at = at.max(self.last_update_at);
        Ok(())
    }

    /// Exposures announced for the batch.
    pub fn total_exposures(&self) -> usize {
        self.total_exposures
    }

    /// Exposures processed so far.
    pub fn processed_exposures(&self) -> usize {
        self.processed_exposures
    }

    /// When processing started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time of the last update.
    pub fn last_update_at(&self) -> DateTime<Utc> {
        self.last_update_at
    }

    /// Time between start and the last update.
    pub fn elapsed(&self) -> Duration {
        self.last_update_at - self.started_at
    }

    /// Completion on the 0-100 scale, 2 dp. An empty batch reports 100.
    pub fn percentage_complete(&self) -> Decimal {
        if self.total_exposures == 0 {
            return round_half_up(Decimal::ONE_HUNDRED, 2);
        }
        let pct = Decimal::from(self.processed_exposures) / Decimal::from(self.total_exposures)
            * Decimal::ONE_HUNDRED;
        round_half_up(pct, 2)
    }

    /// Exposures per second since start; zero before any time has elapsed.
    #[allow(clippy::cast_precision_loss)]
    pub fn processing_rate(&self) -> f64 {
        let millis = self.elapsed().num_milliseconds();
        if millis <= 0 {
            return 0.0;
        }
        self.processed_exposures as f64 / (millis as f64 / 1000.0)
    }

    /// Remaining time at the current rate; `None` while the rate is zero.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn estimated_time_remaining(&self) -> Option<Duration> {
        let rate = self.processing_rate();
        if rate <= 0.0 {
            return None;
        }
        let remaining = (self.total_exposures - self.processed_exposures) as f64;
        Some(Duration::milliseconds((remaining / rate * 1000.0).round() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_rate_and_eta() {
        let mut p = ProcessingProgress::new(1000, t0());
        p.update(250, t0() + Duration::seconds(10)).unwrap();

        assert_eq!(p.percentage_complete(), dec!(25));
        assert_relative_eq!(p.processing_rate(), 25.0);
        assert_eq!(p.estimated_time_remaining(), Some(Duration::seconds(30)));
    }

    #[test]
    fn test_no_eta_without_rate() {
        let p = ProcessingProgress::new(1000, t0());
        assert_eq!(p.processing_rate(), 0.0);
        assert!(p.estimated_time_remaining().is_none());

        let mut p = ProcessingProgress::new(1000, t0());
        p.update(0, t0() + Duration::seconds(5)).unwrap();
        assert!(p.estimated_time_remaining().is_none());
    }

    #[test]
    fn test_cannot_exceed_total() {
        let mut p = ProcessingProgress::new(10, t0());
        assert!(matches!(
            p.update(11, t0()),
            Err(PortfolioError::ProgressExceedsTotal { processed: 11, total: 10 })
        ));
        assert_eq!(p.processed_exposures(), 0);
        p.update(10, t0()).unwrap();
        assert_eq!(p.percentage_complete(), dec!(100));
        assert_eq!(p.estimated_time_remaining(), None);
    }

    #[test]
    fn test_empty_batch_is_complete() {
        let p = ProcessingProgress::new(0, t0());
        assert_eq!(p.percentage_complete(), dec!(100));
    }

    #[test]
    fn test_clock_never_goes_backwards() {
        let mut p = ProcessingProgress::new(10, t0());
        p.update(5, t0() + Duration::seconds(5)).unwrap();
        p.update(6, t0()).unwrap();
        assert_eq!(p.last_update_at(), t0() + Duration::seconds(5));
    }
}
