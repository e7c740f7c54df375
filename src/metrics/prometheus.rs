//! Prometheus metrics registration and export.
//!
//! Defines every metric exported by the service and the functions for
//! initializing and rendering them.

use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total HTTP requests, labeled by method, endpoint and status code.
pub static HTTP_REQUESTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// HTTP request latency in seconds, labeled by method and endpoint.
pub static HTTP_REQUEST_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Total pipeline runs, labeled by final status.
pub static PIPELINE_RUNS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Pipeline run duration in seconds.
pub static PIPELINE_RUN_DURATION: OnceLock<Histogram> = OnceLock::new();

/// Number of jobs waiting in the pipeline queue.
pub static PIPELINE_QUEUE_DEPTH: OnceLock<Gauge> = OnceLock::new();

/// Number of workers currently executing a job.
pub static PIPELINE_ACTIVE_WORKERS: OnceLock<Gauge> = OnceLock::new();

/// Distribution of predicted house values.
pub static PREDICTIONS_VALUE: OnceLock<Histogram> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Safe to call more than once; later calls leave the first registry in place.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let http_requests_total = CounterVec::new(
        Opts::new("http_requests_total", "Total HTTP requests"),
        &["method", "endpoint", "status"],
    )?;

    let http_request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"],
    )?;

    let pipeline_runs_total = CounterVec::new(
        Opts::new("pipeline_runs_total", "Total prediction pipeline runs"),
        &["status"],
    )?;

    let pipeline_run_duration = Histogram::with_opts(
        HistogramOpts::new(
            "pipeline_run_duration_seconds",
            "Prediction pipeline run duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 300.0]),
    )?;

    let pipeline_queue_depth = Gauge::new(
        "pipeline_queue_depth",
        "Number of pipeline jobs waiting to run",
    )?;

    let pipeline_active_workers = Gauge::new(
        "pipeline_active_workers",
        "Number of pipeline workers executing a job",
    )?;

    let predictions_value = Histogram::with_opts(
        HistogramOpts::new("predictions_value", "Distribution of predicted house values")
            .buckets(vec![
                50_000.0, 100_000.0, 150_000.0, 200_000.0, 300_000.0, 400_000.0, 500_000.0,
            ]),
    )?;

    registry.register(Box::new(http_requests_total.clone()))?;
    registry.register(Box::new(http_request_duration.clone()))?;
    registry.register(Box::new(pipeline_runs_total.clone()))?;
    registry.register(Box::new(pipeline_run_duration.clone()))?;
    registry.register(Box::new(pipeline_queue_depth.clone()))?;
    registry.register(Box::new(pipeline_active_workers.clone()))?;
    registry.register(Box::new(predictions_value.clone()))?;

    // Losing a race here means another caller already initialized them
    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(http_requests_total);
    let _ = HTTP_REQUEST_DURATION.set(http_request_duration);
    let _ = PIPELINE_RUNS_TOTAL.set(pipeline_runs_total);
    let _ = PIPELINE_RUN_DURATION.set(pipeline_run_duration);
    let _ = PIPELINE_QUEUE_DEPTH.set(pipeline_queue_depth);
    let _ = PIPELINE_ACTIVE_WORKERS.set(pipeline_active_workers);
    let _ = PREDICTIONS_VALUE.set(predictions_value);

    tracing::info!("Prometheus metrics initialized");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

/// Content type of the text exposition format.
pub fn metrics_content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
