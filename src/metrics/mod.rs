//! Prometheus metrics for the prediction service.
//!
//! # Example
//!
//! ```ignore
//! use housing_predictor::metrics::{init_metrics, export_metrics, MetricsCollector};
//!
//! init_metrics().expect("Failed to initialize metrics");
//!
//! let collector = MetricsCollector::new();
//! collector.record_pipeline_run("success", 0.35);
//!
//! // Served by GET /metrics
//! let metrics_text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::MetricsCollector;
pub use prometheus::{export_metrics, init_metrics, metrics_content_type};

pub use prometheus::{
    HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION, PIPELINE_ACTIVE_WORKERS, PIPELINE_QUEUE_DEPTH,
    PIPELINE_RUNS_TOTAL, PIPELINE_RUN_DURATION, PREDICTIONS_VALUE, REGISTRY,
};
