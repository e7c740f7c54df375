//! Linear regression model loaded from a JSON artifact.

use std::io::ErrorKind;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::adapter::ModelError;
use super::features::{FEATURE_NAMES, NUM_FEATURES};

/// Model type tag accepted in artifacts.
pub const LINEAR_REGRESSION: &str = "linear_regression";

/// On-disk representation of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_type: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ModelArtifact {
    /// Reads and parses an artifact file without blocking the runtime.
    pub async fn from_path(path: &Path) -> Result<Self, ModelError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ModelError::ArtifactNotFound(path.display().to_string()),
            _ => ModelError::ArtifactParse(format!("{}: {}", path.display(), e)),
        })?;
        serde_json::from_str(&content)
            .map_err(|e| ModelError::ArtifactParse(format!("{}: {}", path.display(), e)))
    }
}

/// Ordinary least squares regressor: `y = X . w + b`.
#[derive(Debug, Clone)]
pub struct LinearRegressionModel {
    coefficients: Array1<f64>,
    intercept: f64,
    version: Option<String>,
}

impl LinearRegressionModel {
    pub fn new(coefficients: Array1<f64>, intercept: f64) -> Result<Self, ModelError> {
        if coefficients.len() != NUM_FEATURES {
            return Err(ModelError::ShapeMismatch(format!(
                "expected {} coefficients, got {}",
                NUM_FEATURES,
                coefficients.len()
            )));
        }
        Ok(Self {
            coefficients,
            intercept,
            version: None,
        })
    }

    /// Builds a model from an artifact, checking its layout against the
    /// canonical feature order.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        if artifact.model_type != LINEAR_REGRESSION {
            return Err(ModelError::ArtifactParse(format!(
                "unsupported model type: {}",
                artifact.model_type
            )));
        }

        if artifact.feature_names.len() != NUM_FEATURES
            || artifact
                .feature_names
                .iter()
                .zip(FEATURE_NAMES.iter())
                .any(|(actual, expected)| actual != expected)
        {
            return Err(ModelError::ShapeMismatch(format!(
                "feature names do not match canonical order: [{}]",
                artifact.feature_names.join(", ")
            )));
        }

        let mut model = Self::new(Array1::from(artifact.coefficients), artifact.intercept)?;
        model.version = artifact.version;
        Ok(model)
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Predicts one value per row of `features`.
    ///
    /// # Arguments
    ///
    /// * `features` - Matrix of shape (n_samples, 13) in canonical column order
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if features.ncols() != NUM_FEATURES {
            return Err(ModelError::ShapeMismatch(format!(
                "expected {} feature columns, got {}",
                NUM_FEATURES,
                features.ncols()
            )));
        }
        Ok(features.dot(&self.coefficients) + self.intercept)
    }

    /// Predicts a single feature vector.
    pub fn predict_one(&self, features: &Array1<f64>) -> Result<f64, ModelError> {
        if features.len() != NUM_FEATURES {
            return Err(ModelError::ShapeMismatch(format!(
                "expected {} features, got {}",
                NUM_FEATURES,
                features.len()
            )));
        }
        let value = features.dot(&self.coefficients) + self.intercept;
        if !value.is_finite() {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(value)
    }
}
