//! Error types for the prediction pipeline.
//!
//! `PipelineError` is the domain-level error shared by the service, the
//! pipeline stages and the ports. Adapters keep their own error enums
//! (`StorageError`, `ModelError`, ...) and convert into this one at the
//! port boundary.

use thiserror::Error;

/// Errors raised while submitting, running or querying a prediction pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Data validation failed: {0}")]
    DataValidation(String),

    #[error("Data cleaning failed: {0}")]
    DataCleaning(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    #[error("Pipeline run not found: {0}")]
    RunNotFound(String),
}

impl PipelineError {
    /// Returns true for errors caused by the submitted data rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::DataValidation(_) | PipelineError::DataCleaning(_)
        )
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::DataValidation(_) => "data_validation",
            PipelineError::DataCleaning(_) => "data_cleaning",
            PipelineError::Prediction(_) => "prediction",
            PipelineError::Storage(_) => "storage",
            PipelineError::Orchestrator(_) => "orchestrator",
            PipelineError::RunNotFound(_) => "run_not_found",
        }
    }
}

/// Convenience result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::DataValidation("population must be non-negative".to_string());
        assert!(err.to_string().contains("population must be non-negative"));

        let err = PipelineError::RunNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Pipeline run not found: abc");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(PipelineError::DataValidation("x".into()).is_client_error());
        assert!(PipelineError::DataCleaning("x".into()).is_client_error());
        assert!(!PipelineError::Storage("x".into()).is_client_error());
        assert!(!PipelineError::Prediction("x".into()).is_client_error());
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(PipelineError::Storage("x".into()).kind(), "storage");
        assert_eq!(PipelineError::Orchestrator("x".into()).kind(), "orchestrator");
    }
}
