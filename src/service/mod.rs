//! Prediction service: the domain core behind the driving adapters.
//!
//! Coordinates the ETL and storage ports for the submit/poll workflow.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::{HousingRecord, PipelineStatus};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::{EtlPort, PredictionOutcome, PredictionServicePort, StoragePort};

/// Service for handling prediction requests.
#[derive(Clone)]
pub struct PredictionService {
    etl: Arc<dyn EtlPort>,
    storage: Arc<dyn StoragePort>,
}

impl PredictionService {
    pub fn new(etl: Arc<dyn EtlPort>, storage: Arc<dyn StoragePort>) -> Self {
        info!("PredictionService initialized");
        Self { etl, storage }
    }

    pub fn storage(&self) -> &Arc<dyn StoragePort> {
        &self.storage
    }

    async fn resolve(&self, run_id: &str) -> PipelineResult<PredictionOutcome> {
        let status = match self.etl.get_pipeline_status(run_id).await {
            Ok(status) => status,
            Err(PipelineError::RunNotFound(_)) => {
                // Runs do not outlive the process; stored predictions do
                return Ok(match self.storage.get_prediction(run_id).await? {
                    Some(prediction) => PredictionOutcome::Completed(prediction),
                    None => PredictionOutcome::NotFound,
                });
            }
            Err(e) => return Err(e),
        };

        match status {
            PipelineStatus::Failed => {
                warn!(run_id = %run_id, "Pipeline failed");
                Ok(PredictionOutcome::Failed)
            }
            PipelineStatus::Completed => match self.storage.get_prediction(run_id).await? {
                Some(prediction) => Ok(PredictionOutcome::Completed(prediction)),
                None => {
                    error!(run_id = %run_id, "Prediction not found in storage");
                    Ok(PredictionOutcome::Failed)
                }
            },
            PipelineStatus::Pending => Ok(PredictionOutcome::Pending),
            PipelineStatus::Running => Ok(PredictionOutcome::Running),
        }
    }
}

#[async_trait]
impl PredictionServicePort for PredictionService {
    async fn submit_prediction_request(&self, record: HousingRecord) -> PipelineResult<String> {
        let result = match self.storage.save_housing_record(&record).await {
            Ok(_) => self.etl.start_prediction_pipeline(&record).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(run_id) => {
                info!(run_id = %run_id, record_id = %record.id, "Submitted prediction request");
                Ok(run_id)
            }
            Err(e) => {
                error!(record_id = %record.id, error = %e, "Error submitting prediction request");
                Err(e)
            }
        }
    }

    async fn get_prediction_result(&self, run_id: &str) -> PipelineResult<PredictionOutcome> {
        match self.resolve(run_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Error getting prediction result");
                Ok(PredictionOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::housing::sample_record;
    use crate::domain::Prediction;
    use crate::storage::InMemoryStorage;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// ETL port returning canned statuses.
    #[derive(Default)]
    struct MockEtl {
        statuses: Mutex<HashMap<String, PipelineStatus>>,
        fail_start: bool,
        fail_status: bool,
        started: Mutex<Vec<String>>,
    }

    impl MockEtl {
        fn with_status(run_id: &str, status: PipelineStatus) -> Self {
            let etl = Self::default();
            etl.statuses
                .lock()
                .unwrap()
                .insert(run_id.to_string(), status);
            etl
        }
    }

    #[async_trait]
    impl EtlPort for MockEtl {
        async fn start_prediction_pipeline(&self, record: &HousingRecord) -> PipelineResult<String> {
            if self.fail_start {
                return Err(PipelineError::Orchestrator("queue is full".to_string()));
            }
            self.started.lock().unwrap().push(record.id.clone());
            Ok("run-123".to_string())
        }

        async fn get_pipeline_status(&self, run_id: &str) -> PipelineResult<PipelineStatus> {
            if self.fail_status {
                return Err(PipelineError::Orchestrator("unreachable".to_string()));
            }
            self.statuses
                .lock()
                .unwrap()
                .get(run_id)
                .copied()
                .ok_or_else(|| PipelineError::RunNotFound(run_id.to_string()))
        }
    }

    fn service(etl: MockEtl, storage: Arc<InMemoryStorage>) -> PredictionService {
        PredictionService::new(Arc::new(etl), storage)
    }

    async fn store_prediction(storage: &InMemoryStorage, run_id: &str) -> HousingRecord {
        let record = sample_record();
        storage.save_housing_record(&record).await.unwrap();
        storage
            .save_prediction(&Prediction::completed(&record.id, 452_600.0, run_id))
            .await
            .unwrap();
        record
    }

    #[tokio::test]
    async fn test_submit_saves_record_then_starts_pipeline() {
        let storage = Arc::new(InMemoryStorage::new());
        let etl = Arc::new(MockEtl::default());
        let service = PredictionService::new(etl.clone(), storage.clone());
        let record = sample_record();

        let run_id = service
            .submit_prediction_request(record.clone())
            .await
            .unwrap();

        assert_eq!(run_id, "run-123");
        assert_eq!(etl.started.lock().unwrap().as_slice(), &[record.id.clone()]);
        assert!(storage.get_housing_record(&record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_submit_propagates_pipeline_error() {
        let etl = MockEtl {
            fail_start: true,
            ..Default::default()
        };
        let service = service(etl, Arc::new(InMemoryStorage::new()));

        let err = service
            .submit_prediction_request(sample_record())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Orchestrator(_)));
    }

    #[tokio::test]
    async fn test_pending_and_running() {
        let storage = Arc::new(InMemoryStorage::new());
        let pending = service(MockEtl::with_status("a", PipelineStatus::Pending), storage.clone());
        let running = service(MockEtl::with_status("a", PipelineStatus::Running), storage);

        assert_eq!(
            pending.get_prediction_result("a").await.unwrap(),
            PredictionOutcome::Pending
        );
        assert_eq!(
            running.get_prediction_result("a").await.unwrap(),
            PredictionOutcome::Running
        );
    }

    #[tokio::test]
    async fn test_completed_returns_stored_prediction() {
        let storage = Arc::new(InMemoryStorage::new());
        let record = store_prediction(&storage, "a").await;
        let service = service(MockEtl::with_status("a", PipelineStatus::Completed), storage);

        match service.get_prediction_result("a").await.unwrap() {
            PredictionOutcome::Completed(prediction) => {
                assert_eq!(prediction.value, 452_600.0);
                assert_eq!(prediction.record, Some(record));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_completed_without_stored_prediction_is_failed() {
        let service = service(
            MockEtl::with_status("a", PipelineStatus::Completed),
            Arc::new(InMemoryStorage::new()),
        );
        assert_eq!(
            service.get_prediction_result("a").await.unwrap(),
            PredictionOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_failed_pipeline() {
        let service = service(
            MockEtl::with_status("a", PipelineStatus::Failed),
            Arc::new(InMemoryStorage::new()),
        );
        assert_eq!(
            service.get_prediction_result("a").await.unwrap(),
            PredictionOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_unknown_run_falls_back_to_storage() {
        let storage = Arc::new(InMemoryStorage::new());
        store_prediction(&storage, "old-run").await;
        let service = service(MockEtl::default(), storage);

        assert!(matches!(
            service.get_prediction_result("old-run").await.unwrap(),
            PredictionOutcome::Completed(_)
        ));
        assert_eq!(
            service.get_prediction_result("never-seen").await.unwrap(),
            PredictionOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_status_errors_become_failed() {
        let etl = MockEtl {
            fail_status: true,
            ..Default::default()
        };
        let service = service(etl, Arc::new(InMemoryStorage::new()));
        assert_eq!(
            service.get_prediction_result("a").await.unwrap(),
            PredictionOutcome::Failed
        );
    }
}
