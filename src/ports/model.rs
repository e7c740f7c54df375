//! Model port: price a housing record with a pre-trained regressor.

use async_trait::async_trait;
use ndarray::Array1;

use crate::domain::HousingRecord;
use crate::error::PipelineResult;

#[async_trait]
pub trait ModelPort: Send + Sync {
    /// Loads the model artifact, replacing any cached model.
    async fn load_model(&self) -> PipelineResult<()>;

    /// Predicts the house value for a record, loading the model on first use.
    async fn predict(&self, record: &HousingRecord) -> PipelineResult<f64>;

    /// Predicts from an already prepared feature vector in canonical order.
    async fn predict_features(&self, features: &Array1<f64>) -> PipelineResult<f64>;
}
