//! ETL port: start a prediction pipeline and poll its status.

use async_trait::async_trait;

use crate::domain::{HousingRecord, PipelineStatus};
use crate::error::PipelineResult;

/// Interface to the orchestrator that runs the prediction pipeline.
#[async_trait]
pub trait EtlPort: Send + Sync {
    /// Starts a prediction pipeline for a housing record and returns its run id.
    async fn start_prediction_pipeline(&self, record: &HousingRecord) -> PipelineResult<String>;

    /// Returns the coarse status of a run.
    ///
    /// Unknown run ids yield `PipelineError::RunNotFound`.
    async fn get_pipeline_status(&self, run_id: &str) -> PipelineResult<PipelineStatus>;
}
