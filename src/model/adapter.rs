//! Model adapter implementing [`ModelPort`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use ndarray::Array1;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::HousingRecord;
use crate::error::{PipelineError, PipelineResult};
use crate::ports::ModelPort;

use super::features::record_to_features;
use super::linear::{LinearRegressionModel, ModelArtifact};

/// Errors raised while loading or evaluating the model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Invalid model artifact: {0}")]
    ArtifactParse(String),

    #[error("Feature shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Model produced a non-finite prediction")]
    NonFiniteOutput,
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        PipelineError::Prediction(err.to_string())
    }
}

/// Serves predictions from a linear model artifact on disk.
///
/// The model is loaded on first use (or eagerly via [`ModelPort::load_model`])
/// and cached for the lifetime of the adapter.
#[derive(Clone)]
pub struct LinearModelAdapter {
    model_path: PathBuf,
    model: Arc<RwLock<Option<Arc<LinearRegressionModel>>>>,
}

impl LinearModelAdapter {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            model: Arc::new(RwLock::new(None)),
        }
    }

    /// Wraps an already constructed model.
    pub fn from_model(model: LinearRegressionModel) -> Self {
        Self {
            model_path: PathBuf::new(),
            model: Arc::new(RwLock::new(Some(Arc::new(model)))),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub async fn is_loaded(&self) -> bool {
        self.model.read().await.is_some()
    }

    async fn load(&self) -> Result<Arc<LinearRegressionModel>, ModelError> {
        let artifact = ModelArtifact::from_path(&self.model_path).await?;
        let model = Arc::new(LinearRegressionModel::from_artifact(artifact)?);

        info!(
            path = %self.model_path.display(),
            version = model.version().unwrap_or("unversioned"),
            "Model loaded"
        );

        *self.model.write().await = Some(Arc::clone(&model));
        Ok(model)
    }

    async fn model(&self) -> Result<Arc<LinearRegressionModel>, ModelError> {
        if let Some(model) = self.model.read().await.as_ref() {
            return Ok(Arc::clone(model));
        }
        self.load().await
    }
}

#[async_trait]
impl ModelPort for LinearModelAdapter {
    async fn load_model(&self) -> PipelineResult<()> {
        self.load().await?;
        Ok(())
    }

    async fn predict(&self, record: &HousingRecord) -> PipelineResult<f64> {
        self.predict_features(&record_to_features(record)).await
    }

    async fn predict_features(&self, features: &Array1<f64>) -> PipelineResult<f64> {
        let model = self.model().await?;
        let value = model.predict_one(features)?;
        debug!(prediction = value, "Model prediction");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::housing::sample_record;
    use crate::model::features::{FEATURE_NAMES, NUM_FEATURES};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_artifact(coefficients: &[f64], intercept: f64) -> NamedTempFile {
        let artifact = ModelArtifact {
            model_type: "linear_regression".to_string(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            coefficients: coefficients.to_vec(),
            intercept,
            version: None,
        };
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&artifact).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[tokio::test]
    async fn test_predict_loads_lazily() {
        let mut coefficients = vec![0.0; NUM_FEATURES];
        coefficients[7] = 100_000.0; // median_income
        let file = write_artifact(&coefficients, 50_000.0);

        let adapter = LinearModelAdapter::new(file.path());
        assert!(!adapter.is_loaded().await);

        let value = adapter.predict(&sample_record()).await.unwrap();
        assert!((value - (50_000.0 + 5.5789 * 100_000.0)).abs() < 1e-6);
        assert!(adapter.is_loaded().await);
    }

    #[tokio::test]
    async fn test_load_model_missing_artifact() {
        let adapter = LinearModelAdapter::new("/nonexistent/model.json");
        let err = adapter.load_model().await.unwrap_err();
        assert!(matches!(err, PipelineError::Prediction(msg) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn test_load_model_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();

        let adapter = LinearModelAdapter::new(file.path());
        let err = adapter.load_model().await.unwrap_err();
        assert!(matches!(err, PipelineError::Prediction(msg) if msg.contains("Invalid model artifact")));
    }

    #[tokio::test]
    async fn test_predict_features_shape_mismatch() {
        let file = write_artifact(&[1.0; NUM_FEATURES], 0.0);
        let adapter = LinearModelAdapter::new(file.path());

        let err = adapter
            .predict_features(&Array1::zeros(3))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Prediction(_)));
    }

    #[tokio::test]
    async fn test_from_model_skips_disk() {
        let model = LinearRegressionModel::new(Array1::from_elem(NUM_FEATURES, 1.0), 2.0).unwrap();
        let adapter = LinearModelAdapter::from_model(model);

        let value = adapter
            .predict_features(&Array1::from_elem(NUM_FEATURES, 1.0))
            .await
            .unwrap();
        assert_eq!(value, 15.0);
    }
}
