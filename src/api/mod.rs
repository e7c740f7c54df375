//! HTTP API (driving adapter).
//!
//! | Method | Path                     | Response                          |
//! |--------|--------------------------|-----------------------------------|
//! | POST   | `/predictions`           | `{"run_id", "status": "pending"}` |
//! | GET    | `/predictions/{run_id}`  | current state of the run          |
//! | GET    | `/health`                | `{"status": "healthy"}`           |
//! | GET    | `/metrics`               | Prometheus text format            |
//!
//! Errors are returned as `{"detail": "..."}`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use handlers::ApiHandler;
pub use models::{ErrorResponse, HealthResponse, PredictionRequest, PredictionResponse};

/// Builds the application router.
pub fn router(handler: Arc<ApiHandler>) -> Router {
    Router::new()
        .route("/predictions", post(handlers::create_prediction))
        .route("/predictions/{run_id}", get(handlers::get_prediction))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .with_state(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::init_metrics;
    use crate::model::{LinearModelAdapter, LinearRegressionModel, NUM_FEATURES};
    use crate::pipeline::{local_pipeline, LocalPipelineConfig, WorkerPool, WorkerPoolConfig};
    use crate::service::PredictionService;
    use crate::storage::InMemoryStorage;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use ndarray::Array1;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app() -> (Router, WorkerPool) {
        let storage = Arc::new(InMemoryStorage::new());
        let model = LinearRegressionModel::new(Array1::from_elem(NUM_FEATURES, 1.0), 0.0).unwrap();
        let config = LocalPipelineConfig {
            pool: WorkerPoolConfig::new(1).with_poll_interval(Duration::from_millis(10)),
            ..Default::default()
        };

        let (etl, pool) = local_pipeline(
            config,
            storage.clone(),
            Arc::new(LinearModelAdapter::from_model(model)),
        );
        let service = PredictionService::new(Arc::new(etl), storage);
        let app = router(Arc::new(ApiHandler::new(Arc::new(service))));
        (app, pool)
    }

    fn valid_body() -> Value {
        json!({
            "longitude": -122.64,
            "latitude": 38.01,
            "housing_median_age": 36.0,
            "total_rooms": 1336.0,
            "total_bedrooms": 258.0,
            "population": 678.0,
            "households": 249.0,
            "median_income": 5.5789,
            "ocean_proximity": "NEAR OCEAN"
        })
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _pool) = test_app();

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        init_metrics().unwrap();
        let (app, _pool) = test_app();

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_unknown_run_is_404() {
        let (app, _pool) = test_app();

        let response = app.oneshot(get("/predictions/does-not-exist")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Prediction run not found: does-not-exist"})
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_422() {
        let (app, _pool) = test_app();

        let response = app
            .oneshot(post_json("/predictions", "{not json".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await.get("detail").is_some());
    }

    #[tokio::test]
    async fn test_unknown_category_is_422() {
        let (app, _pool) = test_app();
        let mut body = valid_body();
        body["ocean_proximity"] = json!("MOUNTAINS");

        let response = app
            .oneshot(post_json("/predictions", body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_negative_count_is_400() {
        let (app, _pool) = test_app();
        let mut body = valid_body();
        body["total_rooms"] = json!(-5.0);

        let response = app
            .oneshot(post_json("/predictions", body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_then_poll_until_completed() {
        let (app, mut pool) = test_app();
        pool.start().unwrap();

        let response = app
            .clone()
            .oneshot(post_json("/predictions", valid_body().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let submitted = body_json(response).await;
        assert_eq!(submitted["status"], "pending");
        assert!(submitted.get("prediction").is_none());
        let run_id = submitted["run_id"].as_str().unwrap().to_string();

        let mut last = Value::Null;
        for _ in 0..200 {
            let response = app
                .clone()
                .oneshot(get(&format!("/predictions/{}", run_id)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            last = body_json(response).await;
            if last["status"] == "completed" || last["status"] == "failed" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(last["status"], "completed");
        assert_eq!(last["run_id"], run_id.as_str());
        assert!(last["prediction"].as_f64().is_some());
        assert!(last.get("completed_at").is_some());

        pool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let (app, _pool) = test_app();
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
