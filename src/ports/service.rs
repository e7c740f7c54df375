//! Inbound service port used by the driving adapters (HTTP, CLI).

use async_trait::async_trait;

use crate::domain::{HousingRecord, Prediction, PredictionStatus};
use crate::error::PipelineResult;

/// What a poll for a run id resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Pending,
    Running,
    Completed(Prediction),
    Failed,
    NotFound,
}

impl PredictionOutcome {
    pub fn status(&self) -> PredictionStatus {
        match self {
            PredictionOutcome::Pending => PredictionStatus::Pending,
            PredictionOutcome::Running => PredictionStatus::Running,
            PredictionOutcome::Completed(_) => PredictionStatus::Completed,
            PredictionOutcome::Failed => PredictionStatus::Failed,
            PredictionOutcome::NotFound => PredictionStatus::NotFound,
        }
    }
}

#[async_trait]
pub trait PredictionServicePort: Send + Sync {
    /// Submits a record for prediction and returns the pipeline run id.
    async fn submit_prediction_request(&self, record: HousingRecord) -> PipelineResult<String>;

    /// Resolves the current state of a prediction request.
    async fn get_prediction_result(&self, run_id: &str) -> PipelineResult<PredictionOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status() {
        assert_eq!(PredictionOutcome::Pending.status(), PredictionStatus::Pending);
        assert_eq!(PredictionOutcome::NotFound.status(), PredictionStatus::NotFound);
        let prediction = Prediction::completed("r", 1.0, "run");
        assert_eq!(
            PredictionOutcome::Completed(prediction).status(),
            PredictionStatus::Completed
        );
    }
}
