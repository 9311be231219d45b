//! Bounded pool for blocking work
//!
//! Sampling calls block for as long as the model runs. The scheduler moves
//! them onto tokio's blocking threads while a semaphore caps how many run
//! at once, so producers only ever await a [`JobHandle`].

use std::sync::Arc;
use std::time::Duration;

use scrivener_config::SchedulerConfig;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Scheduler is closed")]
    Closed,

    #[error("Job exceeded its time limit of {0:?}")]
    TimedOut(Duration),

    #[error("Job panicked: {0}")]
    Panicked(String),
}

/// Dispatches blocking closures onto a fixed number of worker slots.
#[derive(Debug, Clone)]
pub struct RenderScheduler {
    permits: Arc<Semaphore>,
    workers: usize,
    timeout: Option<Duration>,
}

impl RenderScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        let workers = config.workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            timeout: config.sample_timeout,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Queue `work` for a worker slot. Must be called within a tokio runtime.
    ///
    /// The time limit, when configured, starts once a slot is acquired. A job
    /// that overruns it is reported as timed out; the blocking call itself
    /// cannot be interrupted and keeps its slot until it returns.
    pub fn dispatch<T, F>(&self, work: F) -> JobHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let limit = self.timeout;

        let task = tokio::spawn(async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|_| ScheduleError::Closed)?;

            let blocking = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                work()
            });

            match limit {
                Some(limit) => match tokio::time::timeout(limit, blocking).await {
                    Ok(joined) => joined.map_err(|e| ScheduleError::Panicked(e.to_string())),
                    Err(_) => {
                        warn!("Blocking job exceeded {:?}", limit);
                        Err(ScheduleError::TimedOut(limit))
                    }
                },
                None => blocking
                    .await
                    .map_err(|e| ScheduleError::Panicked(e.to_string())),
            }
        });

        JobHandle { task }
    }

    /// Dispatch and wait in one step
    pub async fn run<T, F>(&self, work: F) -> Result<T, ScheduleError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.dispatch(work).join().await
    }

    /// Refuse new jobs. Jobs already holding a slot run to completion.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

/// Pending result of a dispatched job. Dropping it abandons the job.
#[derive(Debug)]
pub struct JobHandle<T> {
    task: JoinHandle<Result<T, ScheduleError>>,
}

impl<T> JobHandle<T> {
    pub async fn join(mut self) -> Result<T, ScheduleError> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ScheduleError::Closed),
            Err(e) => Err(ScheduleError::Panicked(e.to_string())),
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

impl<T> Drop for JobHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scheduler(workers: usize, timeout: Option<Duration>) -> RenderScheduler {
        RenderScheduler::new(&SchedulerConfig {
            workers,
            sample_timeout: timeout,
            ..SchedulerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_run_returns_result() {
        let s = scheduler(2, None);
        assert_eq!(s.run(|| 21 * 2).await, Ok(42));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrency_is_bounded() {
        let s = scheduler(2, None);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                s.dispatch(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_timeout() {
        let s = scheduler(1, Some(Duration::from_millis(20)));
        let result = s
            .run(|| std::thread::sleep(Duration::from_millis(200)))
            .await;
        assert_eq!(result, Err(ScheduleError::TimedOut(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let s = scheduler(1, None);
        let result: Result<(), _> = s.run(|| panic!("sampler blew up")).await;
        assert!(matches!(result, Err(ScheduleError::Panicked(_))));
    }

    #[tokio::test]
    async fn test_closed_rejects_jobs() {
        let s = scheduler(1, None);
        s.close();
        assert!(s.is_closed());
        assert_eq!(s.run(|| 1).await, Err(ScheduleError::Closed));
    }
}
