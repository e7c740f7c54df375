//! High-level metric recording for the service.
//!
//! `MetricsCollector` wraps the raw Prometheus statics so call sites record
//! with consistent labels and never fail when metrics are not initialized.

use super::prometheus::{
    HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION, PIPELINE_ACTIVE_WORKERS, PIPELINE_QUEUE_DEPTH,
    PIPELINE_RUNS_TOTAL, PIPELINE_RUN_DURATION, PREDICTIONS_VALUE,
};

/// Metrics collector for HTTP and pipeline activity.
///
/// # Example
///
/// ```ignore
/// use housing_predictor::metrics::{init_metrics, MetricsCollector};
///
/// init_metrics()?;
/// let collector = MetricsCollector::new();
/// collector.record_http_request("POST", "/predictions", 200, 0.012);
/// collector.record_pipeline_run("success", 0.4);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Record a served HTTP request.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method (e.g., "GET")
    /// * `endpoint` - Matched route template (e.g., "/predictions/{run_id}")
    /// * `status` - Response status code
    /// * `duration_secs` - Handling time in seconds
    pub fn record_http_request(&self, method: &str, endpoint: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();

        if let Some(requests) = HTTP_REQUESTS_TOTAL.get() {
            requests
                .with_label_values(&[method, endpoint, status.as_str()])
                .inc();
        }

        if let Some(duration) = HTTP_REQUEST_DURATION.get() {
            duration
                .with_label_values(&[method, endpoint])
                .observe(duration_secs);
        }

        tracing::trace!(
            method = method,
            endpoint = endpoint,
            status = %status,
            duration_secs = duration_secs,
            "Recorded HTTP request metric"
        );
    }

    /// Record a finished pipeline run.
    ///
    /// # Arguments
    ///
    /// * `status` - Final run status (e.g., "success", "failure", "timeout")
    /// * `duration_secs` - Run duration in seconds
    pub fn record_pipeline_run(&self, status: &str, duration_secs: f64) {
        if let Some(runs) = PIPELINE_RUNS_TOTAL.get() {
            runs.with_label_values(&[status]).inc();
        }

        if let Some(duration) = PIPELINE_RUN_DURATION.get() {
            duration.observe(duration_secs);
        }

        tracing::trace!(status = status, duration_secs = duration_secs, "Recorded pipeline run metric");
    }

    pub fn record_prediction(&self, value: f64) {
        if let Some(predictions) = PREDICTIONS_VALUE.get() {
            predictions.observe(value);
        }
    }

    pub fn update_queue_depth(&self, depth: usize) {
        if let Some(queue_depth) = PIPELINE_QUEUE_DEPTH.get() {
            queue_depth.set(depth as f64);
        }
    }

    pub fn inc_active_workers(&self) {
        if let Some(active) = PIPELINE_ACTIVE_WORKERS.get() {
            active.inc();
        }
    }

    pub fn dec_active_workers(&self) {
        if let Some(active) = PIPELINE_ACTIVE_WORKERS.get() {
            active.dec();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{export_metrics, init_metrics};

    fn ensure_metrics_init() {
        let _ = init_metrics();
    }

    #[test]
    fn test_metrics_collector_is_zero_sized() {
        let collector = MetricsCollector::new();
        assert!(std::mem::size_of_val(&collector) == 0);
    }

    #[test]
    fn test_record_http_request() {
        ensure_metrics_init();
        let collector = MetricsCollector::new();

        collector.record_http_request("POST", "/predictions", 200, 0.05);
        collector.record_http_request("GET", "/predictions/{run_id}", 404, 0.01);

        let exported = export_metrics();
        assert!(exported.contains("http_requests_total"));
        assert!(exported.contains("endpoint=\"/predictions/{run_id}\""));
    }

    #[test]
    fn test_record_pipeline_activity() {
        ensure_metrics_init();
        let collector = MetricsCollector::new();

        collector.record_pipeline_run("success", 0.2);
        collector.record_pipeline_run("failure", 0.1);
        collector.record_prediction(250_000.0);
        collector.update_queue_depth(3);
        collector.inc_active_workers();
        collector.dec_active_workers();

        let exported = export_metrics();
        assert!(exported.contains("pipeline_run_duration_seconds"));
        assert!(exported.contains("predictions_value"));
    }

    #[test]
    fn test_recording_before_init_does_not_panic() {
        // Statics may or may not be set depending on test order
        MetricsCollector::new().record_prediction(1.0);
    }
}
