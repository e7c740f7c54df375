//! Storage port for housing records and predictions.

use async_trait::async_trait;

use crate::domain::{HousingRecord, Prediction};
use crate::error::PipelineResult;

/// Persistence for the two related rows behind every prediction.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Saves (or replaces) a housing record and returns its id.
    async fn save_housing_record(&self, record: &HousingRecord) -> PipelineResult<String>;

    /// Fetches a housing record by id.
    async fn get_housing_record(&self, record_id: &str) -> PipelineResult<Option<HousingRecord>>;

    /// Saves a prediction and returns its id.
    ///
    /// The referenced housing record must already exist. A second prediction
    /// for the same run id replaces the first.
    async fn save_prediction(&self, prediction: &Prediction) -> PipelineResult<String>;

    /// Fetches the prediction produced by a pipeline run, with its record attached.
    async fn get_prediction(&self, run_id: &str) -> PipelineResult<Option<Prediction>>;

    /// Lists the most recent predictions, newest first.
    async fn list_predictions(&self, limit: i64) -> PipelineResult<Vec<Prediction>>;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> PipelineResult<()>;
}
