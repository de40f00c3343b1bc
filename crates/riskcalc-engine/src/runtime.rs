//! Retry with exponential backoff for collaborator I/O.
//!
//! Downloads and result storage go through [`RetryConfig::execute`], which
//! retries transient [`TraitError`]s, records every attempt, and stops as
//! soon as the surrounding batch is cancelled (including mid-backoff).

use std::future::Future;
use std::time::{Duration, Instant};

use riskcalc_config::RetrySettings;
use riskcalc_traits::TraitError;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Configuration for retry logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(s: &RetrySettings) -> Self {
        Self {
            max_attempts: s.max_attempts.max(1),
            initial_delay: s.initial_delay(),
            max_delay: s.max_delay(),
            backoff_multiplier: s.backoff_multiplier,
            jitter: s.jitter,
        }
    }
}

/// Outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The operation succeeded.
    Succeeded,
    /// The operation failed with this error.
    Failed(TraitError),
    /// The batch was cancelled while the attempt was running.
    Cancelled,
}

/// Latency and outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Time spent in the operation.
    pub latency: Duration,
    /// What happened.
    pub outcome: AttemptOutcome,
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryFailure {
    /// Every attempt failed with a transient error.
    Exhausted(TraitError),
    /// A non-transient error ended the loop early.
    Permanent(TraitError),
    /// The cancellation token fired.
    Cancelled,
}

/// Result of a retried operation with its attempt log.
#[derive(Debug)]
pub struct Retried<T> {
    /// Final result.
    pub result: Result<T, RetryFailure>,
    /// One record per attempt made.
    pub attempts: Vec<AttemptRecord>,
}

impl<T> Retried<T> {
    /// Number of attempts actually started.
    pub fn attempt_count(&self) -> u32 {
        u32::try_from(self.attempts.len()).unwrap_or(u32::MAX)
    }
}

impl RetryConfig {
    /// Calculates the delay after the given 0-based failed attempt.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay_ms = if self.jitter {
            // Add up to 25% jitter
            let jitter_factor = 1.0 + (rand_jitter() * 0.25);
            delay_ms * jitter_factor
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay_ms as u64)
    }

    /// Runs `f` until it succeeds, fails permanently, runs out of attempts,
    /// or `cancel` fires.
    ///
    /// `f` receives the 1-based attempt number. Only errors for which
    /// [`TraitError::is_transient`] holds are retried.
    pub async fn execute<F, Fut, T>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut f: F,
    ) -> Retried<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TraitError>>,
    {
        let mut attempts = Vec::new();
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Retried {
                    result: Err(RetryFailure::Cancelled),
                    attempts,
                };
            }
            attempt += 1;

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                r = f(attempt) => Some(r),
            };
            let latency = started.elapsed();

            let error = match result {
                None => {
                    attempts.push(AttemptRecord {
                        attempt,
                        latency,
                        outcome: AttemptOutcome::Cancelled,
                    });
                    tracing::warn!(operation, attempt, "Operation cancelled mid-attempt");
                    return Retried {
                        result: Err(RetryFailure::Cancelled),
                        attempts,
                    };
                }
                Some(Ok(value)) => {
                    attempts.push(AttemptRecord {
                        attempt,
                        latency,
                        outcome: AttemptOutcome::Succeeded,
                    });
                    tracing::debug!(
                        operation,
                        attempt,
                        latency_ms = latency.as_millis() as u64,
                        "Attempt succeeded"
                    );
                    return Retried {
                        result: Ok(value),
                        attempts,
                    };
                }
                Some(Err(e)) => e,
            };

            attempts.push(AttemptRecord {
                attempt,
                latency,
                outcome: AttemptOutcome::Failed(error.clone()),
            });

            if !error.is_transient() {
                tracing::warn!(operation, attempt, error = %error, "Permanent failure, not retrying");
                return Retried {
                    result: Err(RetryFailure::Permanent(error)),
                    attempts,
                };
            }
            if attempt >= self.max_attempts {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %error,
                    "All retry attempts exhausted"
                );
                return Retried {
                    result: Err(RetryFailure::Exhausted(error)),
                    attempts,
                };
            }

            let delay = self.delay_for_attempt(attempt - 1);
            tracing::info!(
                operation,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after delay"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::warn!(operation, attempt, "Retry backoff cancelled");
                    return Retried {
                        result: Err(RetryFailure::Cancelled),
                        attempts,
                    };
                }
                () = sleep(delay) => {}
            }
        }
    }
}

/// Simple pseudo-random jitter (no external dependency).
fn rand_jitter() -> f64 {
    // Use current time nanoseconds for simple randomness
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}
