//! Prediction entity and the statuses a prediction request moves through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::housing::HousingRecord;

/// Status of a prediction request as seen by API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    NotFound,
}

impl std::fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionStatus::Pending => write!(f, "pending"),
            PredictionStatus::Running => write!(f, "running"),
            PredictionStatus::Completed => write!(f, "completed"),
            PredictionStatus::Failed => write!(f, "failed"),
            PredictionStatus::NotFound => write!(f, "not_found"),
        }
    }
}

/// Coarse status of a pipeline run reported by the ETL port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStatus::Pending => write!(f, "pending"),
            PipelineStatus::Running => write!(f, "running"),
            PipelineStatus::Completed => write!(f, "completed"),
            PipelineStatus::Failed => write!(f, "failed"),
        }
    }
}

impl From<PipelineStatus> for PredictionStatus {
    fn from(status: PipelineStatus) -> Self {
        match status {
            PipelineStatus::Pending => PredictionStatus::Pending,
            PipelineStatus::Running => PredictionStatus::Running,
            PipelineStatus::Completed => PredictionStatus::Completed,
            PipelineStatus::Failed => PredictionStatus::Failed,
        }
    }
}

/// A predicted price for one housing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    /// Housing record this prediction is for.
    pub record_id: String,
    /// Predicted median house value.
    pub value: f64,
    pub created_at: DateTime<Utc>,
    pub status: PredictionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<HousingRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Pipeline run that produced this prediction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl Prediction {
    /// Creates a completed prediction produced by `run_id`.
    pub fn completed(record_id: impl Into<String>, value: f64, run_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            record_id: record_id.into(),
            value,
            created_at: Utc::now(),
            status: PredictionStatus::Completed,
            record: None,
            error: None,
            run_id: Some(run_id.into()),
        }
    }

    /// Attaches the housing record the prediction was made for.
    pub fn with_record(mut self, record: HousingRecord) -> Self {
        self.record = Some(record);
        self
    }
}
