//! In-process orchestrator behind [`EtlPort`].
//!
//! `LocalEtlAdapter` turns a submitted record into a queued
//! [`PipelineJob`] and answers status polls from the [`RunRegistry`].
//! The [`WorkerPool`] consumes the same queue and registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{HousingRecord, PipelineStatus};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::{EtlPort, ModelPort, StoragePort};

use super::assets::{execute_job, run_config_for, RunContext, StoredPrediction, RUN_CONFIG_DATA_KEY};
use super::job::{PipelineJob, RunStatus};
use super::queue::JobQueue;
use super::runs::{PipelineRun, RunRegistry};
use super::worker_pool::{WorkerPool, WorkerPoolConfig};

/// ETL adapter that runs the prediction job in process.
#[derive(Clone)]
pub struct LocalEtlAdapter {
    queue: Arc<JobQueue>,
    registry: RunRegistry,
    max_attempts: u32,
}

impl LocalEtlAdapter {
    pub fn new(queue: Arc<JobQueue>, registry: RunRegistry) -> Self {
        Self {
            queue,
            registry,
            max_attempts: 1,
        }
    }

    /// Sets how many times a job may run before its run is marked failed.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub async fn get_run(&self, run_id: &str) -> Option<PipelineRun> {
        self.registry.get(run_id).await
    }

    /// Cancels a run that is still waiting in the queue.
    pub async fn cancel_run(&self, run_id: &str) -> PipelineResult<bool> {
        if self.registry.get(run_id).await.is_none() {
            return Err(PipelineError::RunNotFound(run_id.to_string()));
        }
        Ok(self.registry.cancel(run_id).await)
    }
}

#[async_trait]
impl EtlPort for LocalEtlAdapter {
    async fn start_prediction_pipeline(&self, record: &HousingRecord) -> PipelineResult<String> {
        info!(record_id = %record.id, "Starting prediction pipeline");

        let job = PipelineJob::new(run_config_for(record)?).with_max_attempts(self.max_attempts);
        let run_id = job.run_id.clone();

        self.registry.register(&job).await;
        if let Err(e) = self.queue.enqueue(job) {
            error!(run_id = %run_id, error = %e, "Failed to submit job");
            self.registry.mark_failure(&run_id, e.to_string()).await;
            return Err(PipelineError::Orchestrator(format!("Failed to submit job: {}", e)));
        }

        info!(run_id = %run_id, "Job submitted");
        Ok(run_id)
    }

    async fn get_pipeline_status(&self, run_id: &str) -> PipelineResult<PipelineStatus> {
        let status = self
            .registry
            .status(run_id)
            .await
            .ok_or_else(|| PipelineError::RunNotFound(run_id.to_string()))?;

        Ok(status.to_pipeline_status())
    }
}

/// Settings for [`local_pipeline`].
#[derive(Debug, Clone)]
pub struct LocalPipelineConfig {
    pub pool: WorkerPoolConfig,
    pub queue_capacity: usize,
    pub max_attempts: u32,
}

impl Default for LocalPipelineConfig {
    fn default() -> Self {
        Self {
            pool: WorkerPoolConfig::default(),
            queue_capacity: 1024,
            max_attempts: 1,
        }
    }
}

/// Wires a queue and registry shared by an ETL adapter and a worker pool.
///
/// The pool is returned stopped; call [`WorkerPool::start`].
pub fn local_pipeline(
    config: LocalPipelineConfig,
    storage: Arc<dyn StoragePort>,
    model: Arc<dyn ModelPort>,
) -> (LocalEtlAdapter, WorkerPool) {
    let queue = Arc::new(JobQueue::new(config.queue_capacity));
    let registry = RunRegistry::new();

    let adapter = LocalEtlAdapter::new(Arc::clone(&queue), registry.clone())
        .with_max_attempts(config.max_attempts);
    let pool = WorkerPool::new(config.pool, queue, registry, storage, model);

    (adapter, pool)
}

/// Runs the job graph to completion on the current task, bypassing the queue.
///
/// `raw` is the unvalidated record as it would arrive in a run config.
pub async fn run_job_inline(
    raw: Value,
    storage: Arc<dyn StoragePort>,
    model: Arc<dyn ModelPort>,
) -> PipelineResult<StoredPrediction> {
    let run_id = Uuid::new_v4().to_string();
    let ctx = RunContext::new(run_id.as_str(), storage, model);

    let mut config = Map::new();
    config.insert(RUN_CONFIG_DATA_KEY.to_string(), raw);

    info!(run_id = %run_id, "Running job inline");
    let result = execute_job(&ctx, &Value::Object(config)).await;

    match &result {
        Ok(_) => info!(run_id = %run_id, status = %RunStatus::Success, "Inline run finished"),
        Err(e) => error!(run_id = %run_id, status = %RunStatus::Failure, error = %e, "Inline run failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::housing::sample_record;
    use crate::model::{LinearModelAdapter, LinearRegressionModel, NUM_FEATURES};
    use crate::storage::InMemoryStorage;
    use ndarray::Array1;
    use serde_json::json;
    use std::time::Duration;

    fn model() -> Arc<dyn ModelPort> {
        let model =
            LinearRegressionModel::new(Array1::from_elem(NUM_FEATURES, 2.0), 1.0).unwrap();
        Arc::new(LinearModelAdapter::from_model(model))
    }

    #[tokio::test]
    async fn test_start_pipeline_registers_pending_run() {
        let adapter = LocalEtlAdapter::new(Arc::new(JobQueue::new(4)), RunRegistry::new());

        let run_id = adapter
            .start_prediction_pipeline(&sample_record())
            .await
            .unwrap();

        assert_eq!(
            adapter.get_pipeline_status(&run_id).await.unwrap(),
            PipelineStatus::Pending
        );
        assert_eq!(adapter.get_run(&run_id).await.unwrap().status, RunStatus::Queued);
    }

    #[tokio::test]
    async fn test_unknown_run_is_not_found() {
        let adapter = LocalEtlAdapter::new(Arc::new(JobQueue::new(4)), RunRegistry::new());

        let err = adapter.get_pipeline_status("nope").await.unwrap_err();
        assert!(matches!(err, PipelineError::RunNotFound(id) if id == "nope"));
        assert!(adapter.cancel_run("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_full_queue_fails_submission() {
        let adapter = LocalEtlAdapter::new(Arc::new(JobQueue::new(1)), RunRegistry::new());
        adapter
            .start_prediction_pipeline(&sample_record())
            .await
            .unwrap();

        let err = adapter
            .start_prediction_pipeline(&sample_record())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Orchestrator(msg) if msg.contains("full")));

        let counts = adapter.registry().counts().await;
        assert_eq!(counts.get(&RunStatus::Failure), Some(&1));
    }

    #[tokio::test]
    async fn test_cancel_queued_run_reports_failed() {
        let adapter = LocalEtlAdapter::new(Arc::new(JobQueue::new(4)), RunRegistry::new());
        let run_id = adapter
            .start_prediction_pipeline(&sample_record())
            .await
            .unwrap();

        assert!(adapter.cancel_run(&run_id).await.unwrap());
        assert_eq!(
            adapter.get_pipeline_status(&run_id).await.unwrap(),
            PipelineStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_local_pipeline_completes_run() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut config = LocalPipelineConfig::default();
        config.pool = WorkerPoolConfig::new(1).with_poll_interval(Duration::from_millis(10));

        let (adapter, mut pool) = local_pipeline(config, storage.clone(), model());
        pool.start().unwrap();

        let record = sample_record();
        storage.save_housing_record(&record).await.unwrap();
        let run_id = adapter.start_prediction_pipeline(&record).await.unwrap();

        let mut status = PipelineStatus::Pending;
        for _ in 0..200 {
            status = adapter.get_pipeline_status(&run_id).await.unwrap();
            if status == PipelineStatus::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, PipelineStatus::Completed);

        let prediction = storage.get_prediction(&run_id).await.unwrap().unwrap();
        assert_eq!(prediction.record_id, record.id);
        assert_eq!(storage.record_count().await, 1);

        pool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_job_inline() {
        let storage = Arc::new(InMemoryStorage::new());
        let raw = json!({
            "longitude": "-122.23",
            "latitude": 37.88,
            "housing_median_age": 41,
            "total_rooms": 880,
            "population": 322,
            "households": 126,
            "median_income": 8.3252,
            "ocean_proximity": "NEAR BAY"
        });

        let stored = run_job_inline(raw, storage.clone(), model()).await.unwrap();
        assert!(storage.get_prediction(&stored.run_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_job_inline_invalid() {
        let storage = Arc::new(InMemoryStorage::new());
        let err = run_job_inline(json!({"ocean_proximity": "INLAND"}), storage, model())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
