//! Worker pool that executes prediction jobs from the shared queue.
//!
//! Each worker runs as an independent tokio task, pulls jobs from the
//! [`JobQueue`], and drives the job's stages while keeping the
//! [`RunRegistry`] up to date.
//!
//! # Features
//!
//! - Configurable number of workers
//! - Graceful shutdown with broadcast channel
//! - Per-job timeout
//! - Retry of system failures up to the job's `max_attempts`
//! - Retention window for finished runs in the registry
//! - Pool statistics tracking

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::metrics::MetricsCollector;
use crate::ports::{ModelPort, StoragePort};

use super::assets::{execute_job, RunContext};
use super::job::PipelineJob;
use super::queue::{JobQueue, QueueError};
use super::runs::RunRegistry;

/// Errors that can occur in the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The job queue rejected an operation.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Pool is already running")]
    AlreadyRunning,

    #[error("Pool is not running")]
    NotRunning,

    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker tasks to spawn.
    pub num_workers: usize,
    /// How long a worker waits on an empty queue before re-checking for shutdown.
    pub poll_interval: Duration,
    /// Maximum time allowed for a single job attempt.
    pub job_timeout: Duration,
    /// Timeout for graceful shutdown.
    pub shutdown_timeout: Duration,
    /// How long finished runs stay in the registry.
    pub run_retention: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            poll_interval: Duration::from_millis(500),
            job_timeout: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(30),
            run_retention: Duration::from_secs(3600),
        }
    }
}

impl WorkerPoolConfig {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_run_retention(mut self, retention: Duration) -> Self {
        self.run_retention = retention;
        self
    }
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub num_workers: usize,
    /// Number of workers currently executing a job.
    pub active_workers: usize,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub average_job_duration: Duration,
}

impl PoolStats {
    pub fn total_processed(&self) -> u64 {
        self.jobs_completed + self.jobs_failed
    }

    /// Returns the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_processed();
        if total == 0 {
            return 0.0;
        }
        (self.jobs_completed as f64 / total as f64) * 100.0
    }
}

struct SharedPoolStats {
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    total_duration_ms: AtomicU64,
    active_workers: AtomicU64,
}

impl SharedPoolStats {
    fn new() -> Self {
        Self {
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
        }
    }

    fn record_completion(&self, duration: Duration) {
        self.jobs_completed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_failure(&self, duration: Duration) {
        self.jobs_failed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn increment_active(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement_active(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    fn to_pool_stats(&self, num_workers: usize) -> PoolStats {
        let completed = self.jobs_completed.load(Ordering::SeqCst);
        let failed = self.jobs_failed.load(Ordering::SeqCst);
        let total_duration_ms = self.total_duration_ms.load(Ordering::SeqCst);
        let active = self.active_workers.load(Ordering::SeqCst);

        let total_jobs = completed + failed;
        let average_duration = if total_jobs > 0 {
            Duration::from_millis(total_duration_ms / total_jobs)
        } else {
            Duration::ZERO
        };

        PoolStats {
            num_workers,
            active_workers: active as usize,
            jobs_completed: completed,
            jobs_failed: failed,
            average_job_duration: average_duration,
        }
    }
}

/// Everything a worker needs to run a job.
#[derive(Clone)]
struct JobResources {
    queue: Arc<JobQueue>,
    registry: RunRegistry,
    storage: Arc<dyn StoragePort>,
    model: Arc<dyn ModelPort>,
    stats: Arc<SharedPoolStats>,
}

/// Pool of workers processing jobs from a shared queue.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    resources: JobResources,
    shutdown_tx: broadcast::Sender<()>,
    worker_handles: Vec<JoinHandle<()>>,
    is_running: AtomicBool,
}

impl WorkerPool {
    /// Creates a pool over an existing queue and registry.
    ///
    /// # Arguments
    ///
    /// * `config` - Pool configuration
    /// * `queue` - Queue shared with the ETL adapter
    /// * `registry` - Run registry shared with the ETL adapter
    /// * `storage` - Storage used by the stages
    /// * `model` - Model used by the `prediction_result` stage
    pub fn new(
        config: WorkerPoolConfig,
        queue: Arc<JobQueue>,
        registry: RunRegistry,
        storage: Arc<dyn StoragePort>,
        model: Arc<dyn ModelPort>,
    ) -> Self {
        // Only one shutdown signal is ever sent
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            resources: JobResources {
                queue,
                registry,
                storage,
                model,
                stats: Arc::new(SharedPoolStats::new()),
            },
            shutdown_tx,
            worker_handles: Vec::new(),
            is_running: AtomicBool::new(false),
        }
    }

    /// Starts all workers in the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::AlreadyRunning` if the pool is already running.
    pub fn start(&mut self) -> Result<(), PoolError> {
        if self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::AlreadyRunning);
        }

        for i in 0..self.config.num_workers {
            let worker = Worker {
                id: format!("worker-{}", i),
                resources: self.resources.clone(),
                shutdown_rx: self.shutdown_tx.subscribe(),
                poll_interval: self.config.poll_interval,
                job_timeout: self.config.job_timeout,
                run_retention: self.config.run_retention,
                metrics: MetricsCollector::new(),
            };

            self.worker_handles.push(tokio::spawn(worker.run()));
        }

        self.is_running.store(true, Ordering::SeqCst);
        info!(num_workers = self.config.num_workers, "Worker pool started");

        Ok(())
    }

    /// Signals every worker to stop and waits for in-flight jobs to finish.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::ShutdownTimeout` if workers don't stop within
    /// the configured timeout.
    pub async fn shutdown(&mut self) -> Result<(), PoolError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::NotRunning);
        }

        info!("Initiating worker pool shutdown");

        // Workers may already be gone
        let _ = self.shutdown_tx.send(());

        let handles: Vec<JoinHandle<()>> = self.worker_handles.drain(..).collect();
        let shutdown_future = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    error!(error = %e, "Worker task panicked during shutdown");
                }
            }
        };

        let result = tokio::time::timeout(self.config.shutdown_timeout, shutdown_future).await;
        self.is_running.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                info!("Worker pool shutdown complete");
                Ok(())
            }
            Err(_) => Err(PoolError::ShutdownTimeout(self.config.shutdown_timeout)),
        }
    }

    pub fn stats(&self) -> PoolStats {
        self.resources.stats.to_pool_stats(self.config.num_workers)
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

/// A single worker that processes jobs from the queue.
struct Worker {
    id: String,
    resources: JobResources,
    shutdown_rx: broadcast::Receiver<()>,
    poll_interval: Duration,
    job_timeout: Duration,
    run_retention: Duration,
    metrics: MetricsCollector,
}

impl Worker {
    async fn run(mut self) {
        info!(worker_id = %self.id, "Worker started");

        loop {
            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Closed) => {
                    info!(worker_id = %self.id, "Worker received shutdown signal");
                    break;
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(broadcast::error::TryRecvError::Empty) => {}
            }

            match self.resources.queue.dequeue(self.poll_interval).await {
                Ok(Some(job)) => {
                    self.process_job(job).await;
                    self.prune_runs().await;
                }
                Ok(None) => {
                    debug!(worker_id = %self.id, "No jobs available");
                    self.prune_runs().await;
                }
                Err(QueueError::Closed) => {
                    info!(worker_id = %self.id, "Queue closed");
                    break;
                }
                Err(e) => {
                    error!(worker_id = %self.id, error = %e, "Failed to dequeue job");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        info!(worker_id = %self.id, "Worker stopped");
    }

    async fn process_job(&self, mut job: PipelineJob) {
        let registry = &self.resources.registry;
        let run_id = job.run_id.clone();

        job.increment_attempts();
        if !registry.mark_starting(&run_id, job.attempts).await {
            info!(worker_id = %self.id, run_id = %run_id, "Skipping canceled run");
            return;
        }

        info!(
            worker_id = %self.id,
            run_id = %run_id,
            attempt = job.attempts,
            "Processing job"
        );

        self.resources.stats.increment_active();
        self.metrics.inc_active_workers();
        registry.mark_started(&run_id).await;

        let start_time = Instant::now();
        let result = self.execute_with_timeout(&job).await;
        let duration = start_time.elapsed();

        self.resources.stats.decrement_active();
        self.metrics.dec_active_workers();

        match result {
            Ok(()) => {
                registry.mark_success(&run_id).await;
                self.resources.stats.record_completion(duration);
                self.metrics
                    .record_pipeline_run("success", duration.as_secs_f64());
                info!(
                    worker_id = %self.id,
                    run_id = %run_id,
                    duration_ms = duration.as_millis() as u64,
                    "Job completed successfully"
                );
            }
            Err(e) if !e.is_client_error() && job.should_retry() => {
                warn!(
                    worker_id = %self.id,
                    run_id = %run_id,
                    error = %e,
                    remaining_attempts = job.remaining_attempts(),
                    "Job failed, requeueing for retry"
                );
                registry.mark_requeued(&run_id, e.to_string()).await;

                if let Err(requeue_err) = self.resources.queue.requeue(job) {
                    error!(
                        worker_id = %self.id,
                        run_id = %run_id,
                        error = %requeue_err,
                        "Failed to requeue job"
                    );
                    self.fail(&run_id, requeue_err.to_string(), duration).await;
                }
            }
            Err(e) => {
                error!(worker_id = %self.id, run_id = %run_id, error = %e, "Job failed");
                self.fail(&run_id, e.to_string(), duration).await;
            }
        }
    }

    async fn prune_runs(&self) {
        self.resources
            .registry
            .prune_finished(self.run_retention)
            .await;
    }

    async fn fail(&self, run_id: &str, error: String, duration: Duration) {
        self.resources.registry.mark_failure(run_id, error).await;
        self.resources.stats.record_failure(duration);
        self.metrics
            .record_pipeline_run("failure", duration.as_secs_f64());
    }

    async fn execute_with_timeout(&self, job: &PipelineJob) -> Result<(), PipelineError> {
        let ctx = RunContext::new(
            job.run_id.as_str(),
            Arc::clone(&self.resources.storage),
            Arc::clone(&self.resources.model),
        );

        match tokio::time::timeout(self.job_timeout, execute_job(&ctx, &job.run_config)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PipelineError::Orchestrator(format!(
                "Job execution timed out after {:?}",
                self.job_timeout
            ))),
        }
    }
}
