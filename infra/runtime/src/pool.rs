use mshield_domain::config::WorkerConfig;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

#[mshield_derive::mshield_error]
pub enum PoolError {
    /// Every worker is busy and the wait queue is full.
    #[error("Worker pool saturated{}: {in_flight} jobs in flight", format_context(context))]
    Saturated { in_flight: usize, context: Option<Cow<'static, str>> },

    #[error("Worker job timed out{} after {timeout:?}", format_context(context))]
    TimedOut { timeout: Duration, context: Option<Cow<'static, str>> },

    /// The job panicked or was aborted by runtime shutdown.
    #[error("Worker job failed{}: {source}", format_context(context))]
    Join { source: tokio::task::JoinError, context: Option<Cow<'static, str>> },

    #[error("Worker pool closed{}", format_context(context))]
    Closed { context: Option<Cow<'static, str>> },
}

/// Runs blocking jobs on tokio's blocking pool with admission control.
///
/// At most `workers` jobs execute at once and at most `queue_capacity` more wait for a
/// slot; anything beyond that is rejected immediately with [`PoolError::Saturated`].
/// Slots stay occupied until the blocking closure returns, even when the caller has
/// already given up on it.
///
/// Cloning is cheap; clones share the same limits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    workers: Arc<Semaphore>,
    admission: Arc<Semaphore>,
    size: usize,
    capacity: usize,
    timeout: Duration,
}

impl WorkerPool {
    /// `workers == 0` means available parallelism.
    #[must_use]
    pub fn new(workers: usize, queue_capacity: usize, timeout: Duration) -> Self {
        let size = if workers == 0 { crate::detected_parallelism() } else { workers };
        let capacity = size.saturating_add(queue_capacity);
        debug!(workers = size, capacity, timeout_ms = timeout.as_millis(), "Creating worker pool");

        Self {
            inner: Arc::new(PoolInner {
                workers: Arc::new(Semaphore::new(size)),
                admission: Arc::new(Semaphore::new(capacity)),
                size,
                capacity,
                timeout,
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.threads, config.queue_capacity, Duration::from_millis(config.job_timeout_ms))
    }

    /// Runs `job` under the pool's default timeout.
    pub async fn run<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.run_with_timeout(self.inner.timeout, job).await
    }

    /// Runs `job` and waits at most `timeout` for admission plus execution.
    ///
    /// On timeout or caller cancellation the job's output is dropped once it finishes.
    pub async fn run_with_timeout<F, T>(&self, timeout: Duration, job: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let Ok(ticket) = Arc::clone(&self.inner.admission).try_acquire_owned() else {
            let in_flight = self.in_flight();
            warn!(in_flight, capacity = self.inner.capacity, "Worker pool saturated");
            return Err(PoolError::Saturated { in_flight, context: None });
        };

        let workers = Arc::clone(&self.inner.workers);
        let execution = async move {
            let slot = workers.acquire_owned().await.map_err(|_| PoolError::Closed { context: None })?;
            tokio::task::spawn_blocking(move || {
                let _held = (ticket, slot);
                job()
            })
            .await
            .map_err(PoolError::from)
        };

        match tokio::time::timeout(timeout, execution).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis(), "Worker job timed out");
                Err(PoolError::TimedOut { timeout, context: None })
            }
        }
    }

    /// Concurrent job limit.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Running plus queued jobs.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.capacity - self.inner.admission.available_permits()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }
}
