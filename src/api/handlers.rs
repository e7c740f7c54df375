//! Route handlers and the DTO-translating adapter behind them.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{debug, info, instrument};

use super::error::ApiError;
use super::models::{HealthResponse, PredictionRequest, PredictionResponse};
use crate::metrics::{export_metrics, metrics_content_type};
use crate::ports::{PredictionOutcome, PredictionServicePort};

/// Driving adapter: translates HTTP DTOs into calls on the service port.
#[derive(Clone)]
pub struct ApiHandler {
    service: Arc<dyn PredictionServicePort>,
}

impl ApiHandler {
    pub fn new(service: Arc<dyn PredictionServicePort>) -> Self {
        Self { service }
    }

    /// Validates and submits a request, returning the pending run.
    pub async fn submit_prediction(
        &self,
        request: PredictionRequest,
    ) -> Result<PredictionResponse, ApiError> {
        let record = request.to_housing_record();
        record
            .validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        match self.service.submit_prediction_request(record).await {
            Ok(run_id) => Ok(PredictionResponse::submitted(run_id)),
            Err(e) if e.is_client_error() => Err(ApiError::BadRequest(e.to_string())),
            Err(e) => Err(ApiError::Internal(format!(
                "Error processing prediction request: {}",
                e
            ))),
        }
    }

    /// Resolves a run id into the response body for its current state.
    pub async fn get_prediction(&self, run_id: &str) -> Result<PredictionResponse, ApiError> {
        let outcome = self
            .service
            .get_prediction_result(run_id)
            .await
            .map_err(|e| ApiError::Internal(format!("Error retrieving prediction result: {}", e)))?;

        match outcome {
            PredictionOutcome::NotFound => Err(ApiError::NotFound(format!(
                "Prediction run not found: {}",
                run_id
            ))),
            PredictionOutcome::Completed(prediction) => Ok(PredictionResponse::completed(
                run_id,
                prediction.value,
                prediction.created_at,
            )),
            PredictionOutcome::Failed => Ok(PredictionResponse::failed(run_id)),
            in_progress => Ok(PredictionResponse::in_progress(run_id, in_progress.status())),
        }
    }
}

/// `POST /predictions`
#[instrument(skip_all)]
pub async fn create_prediction(
    State(handler): State<Arc<ApiHandler>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload?;
    let response = handler.submit_prediction(request).await?;
    info!(run_id = %response.run_id, "Prediction request accepted");
    Ok(Json(response))
}

/// `GET /predictions/{run_id}`
#[instrument(skip_all)]
pub async fn get_prediction(
    State(handler): State<Arc<ApiHandler>>,
    Path(run_id): Path<String>,
) -> Result<Json<PredictionResponse>, ApiError> {
    debug!(run_id = %run_id, "Polling prediction");
    handler.get_prediction(&run_id).await.map(Json)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

pub async fn metrics() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, metrics_content_type())], export_metrics())
}
