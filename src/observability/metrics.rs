//! Metrics collection and exposition.
//!
//! # Metrics
//! - `roomy_requests_total` (counter): API requests by method, route, status
//! - `roomy_request_duration_seconds` (histogram): API latency
//! - `roomy_rate_limited_total` (counter): rejections by limiter scope
//! - `roomy_backend_requests_total` (counter): backend calls by method, status
//! - `roomy_backend_duration_seconds` (histogram): backend latency
//!
//! # Design Decisions
//! - Macros are no-ops until a recorder is installed, so tests and
//!   metrics-disabled deployments pay almost nothing
//! - Prometheus exporter runs its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("roomy_requests_total", &labels).increment(1);
    metrics::histogram!("roomy_request_duration_seconds", &labels[..2])
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(scope: &str) {
    metrics::counter!("roomy_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

pub fn record_backend_call(method: &str, status: &str, start: Instant) {
    let labels = [("method", method.to_string()), ("status", status.to_string())];
    metrics::counter!("roomy_backend_requests_total", &labels).increment(1);
    metrics::histogram!("roomy_backend_duration_seconds", &labels[..1])
        .record(start.elapsed().as_secs_f64());
}
