//! Metrics collection and exposition.
//!
//! # Metrics
//! - `upload_attempts_total` (counter): attempts by outcome
//! - `upload_bytes_total` (counter): bytes received for audited attempts
//! - `upload_duration_seconds` (histogram): time from first byte to outcome
//! - `upload_rate_limited_total` (counter): requests denied by quota
//! - `upload_audit_failures_total` (counter): audit lines that could not be written
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_upload(outcome: &'static str, bytes: u64, started: Instant) {
    metrics::counter!("upload_attempts_total", "outcome" => outcome).increment(1);
    metrics::counter!("upload_bytes_total").increment(bytes);
    metrics::histogram!("upload_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("upload_rate_limited_total").increment(1);
}

pub fn record_audit_failure() {
    metrics::counter!("upload_audit_failures_total").increment(1);
}
