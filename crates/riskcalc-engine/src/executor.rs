//! Bounded batch executor with caller-runs overflow.
//!
//! At most `max_concurrent_batches` batches run on worker tasks; up to
//! `queue_capacity` more wait for a worker. Once both are full, the
//! submitter runs the batch itself, which slows submission down instead of
//! dropping work.

use std::future::Future;
use std::sync::Arc;

use riskcalc_config::ExecutorSettings;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::EngineResult;

/// How a submitted batch is running.
#[derive(Debug)]
pub enum BatchHandle<T> {
    /// Running (or queued) on a worker task.
    Spawned(JoinHandle<T>),
    /// Already run to completion by the submitter.
    Inline(T),
}

impl<T> BatchHandle<T> {
    /// Waits for the batch.
    pub async fn join(self) -> EngineResult<T> {
        match self {
            BatchHandle::Spawned(handle) => Ok(handle.await?),
            BatchHandle::Inline(value) => Ok(value),
        }
    }

    /// True when the submitter ran the batch because the queue was full.
    pub fn ran_inline(&self) -> bool {
        matches!(self, BatchHandle::Inline(_))
    }
}

/// Runs batch futures under worker and queue limits.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    workers: Arc<Semaphore>,
    admission: Arc<Semaphore>,
    capacity: usize,
}

impl BatchExecutor {
    /// Creates an executor from the configured limits.
    pub fn new(settings: &ExecutorSettings) -> Self {
        let workers = settings.max_concurrent_batches.max(1);
        let capacity = workers + settings.queue_capacity;
        Self {
            workers: Arc::new(Semaphore::new(workers)),
            admission: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Submits a batch.
    ///
    /// `make` is called exactly once, on the submitter, to build the batch
    /// future. When no queue slot is free the future is awaited right here.
    pub async fn submit<F, Fut, T>(&self, make: F) -> BatchHandle<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        match Arc::clone(&self.admission).try_acquire_owned() {
            Ok(slot) => {
                let workers = Arc::clone(&self.workers);
                let job = make();
                debug!(in_flight = self.in_flight(), "Batch queued");
                BatchHandle::Spawned(tokio::spawn(async move {
                    let _slot = slot;
                    // the semaphore is never closed
                    let _permit = workers.acquire_owned().await.ok();
                    job.await
                }))
            }
            Err(_) => {
                warn!(
                    capacity = self.capacity,
                    "Batch queue full, running batch on the submitting task"
                );
                BatchHandle::Inline(make().await)
            }
        }
    }

    /// Batches running or waiting on workers.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.admission.available_permits()
    }

    /// Idle worker slots.
    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_runs_on_worker_when_capacity_free() {
        let executor = BatchExecutor::new(&ExecutorSettings::default());
        let handle = executor.submit(|| async { 7 }).await;
        assert!(!handle.ran_inline());
        assert_eq!(handle.join().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_caller_runs_when_queue_full() {
        let executor = BatchExecutor::new(&ExecutorSettings {
            max_concurrent_batches: 1,
            queue_capacity: 1,
        });
        let (release, gate) = oneshot::channel::<()>();
        let (release2, gate2) = oneshot::channel::<()>();

        let first = executor
            .submit(|| async move {
                let _ = gate.await;
                1
            })
            .await;
        let second = executor
            .submit(|| async move {
                let _ = gate2.await;
                2
            })
            .await;
        assert_eq!(executor.in_flight(), 2);

        let third = executor.submit(|| async { 3 }).await;
        assert!(third.ran_inline());
        assert_eq!(third.join().await.unwrap(), 3);

        let _ = release.send(());
        let _ = release2.send(());
        assert_eq!(first.join().await.unwrap(), 1);
        assert_eq!(second.join().await.unwrap(), 2);
        assert_eq!(executor.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_worker_limit_serializes_batches() {
        let executor = BatchExecutor::new(&ExecutorSettings {
            max_concurrent_batches: 2,
            queue_capacity: 10,
        });
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(
                executor
                    .submit(|| async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await,
            );
        }
        for handle in handles {
            handle.join().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
