//! Job and run-status definitions for the prediction pipeline.
//!
//! - `PipelineJob`: one queued execution of the job graph
//! - `RunStatus`: lifecycle of a run, from queued to a terminal state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::PipelineStatus;

/// Name of the only job graph the service runs.
pub const JOB_NAME: &str = "housing_prediction_job";

/// Default maximum number of attempts for a job.
const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// A unit of work for the worker pool.
///
/// `run_config` carries the raw housing payload handed to the `raw_input`
/// stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineJob {
    pub run_id: String,
    pub job_name: String,
    pub run_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Number of times this job has been attempted.
    pub attempts: u32,
    pub max_attempts: u32,
}

impl PipelineJob {
    /// Creates a job with a fresh run id.
    pub fn new(run_config: serde_json::Value) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            job_name: JOB_NAME.to_string(),
            run_config,
            created_at: Utc::now(),
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Increments the attempt counter. Called before each execution.
    pub fn increment_attempts(&mut self) {
        self.attempts += 1;
    }

    /// Returns whether the job may run again after a failure.
    pub fn should_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }
}

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Waiting in the queue.
    Queued,
    NotStarted,
    /// Picked up by a worker, not yet executing stages.
    Starting,
    /// Executing stages.
    Started,
    Success,
    Failure,
    Canceled,
}

impl RunStatus {
    pub const ALL: [RunStatus; 7] = [
        RunStatus::Queued,
        RunStatus::NotStarted,
        RunStatus::Starting,
        RunStatus::Started,
        RunStatus::Success,
        RunStatus::Failure,
        RunStatus::Canceled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Failure | RunStatus::Canceled
        )
    }

    /// Collapses the run lifecycle into the coarse status reported to callers.
    pub fn to_pipeline_status(&self) -> PipelineStatus {
        match self {
            RunStatus::Success => PipelineStatus::Completed,
            RunStatus::Failure | RunStatus::Canceled => PipelineStatus::Failed,
            RunStatus::Started => PipelineStatus::Running,
            RunStatus::Queued | RunStatus::NotStarted | RunStatus::Starting => {
                PipelineStatus::Pending
            }
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Queued => write!(f, "QUEUED"),
            RunStatus::NotStarted => write!(f, "NOT_STARTED"),
            RunStatus::Starting => write!(f, "STARTING"),
            RunStatus::Started => write!(f, "STARTED"),
            RunStatus::Success => write!(f, "SUCCESS"),
            RunStatus::Failure => write!(f, "FAILURE"),
            RunStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}
