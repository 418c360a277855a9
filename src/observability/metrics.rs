//! Metrics collection and exposition.
//!
//! # Metrics
//! - `workbench_proxy_requests_total` (counter): forwarded calls by outcome
//! - `workbench_proxy_duration_seconds` (histogram): upstream dispatch latency
//! - `workbench_discovery_runs_total` (counter): discovery runs by outcome
//! - `workbench_sse_subscribers` (gauge): connected SSE subscribers
//! - `workbench_sse_events_dropped_total` (counter): events lost to full queues
//!
//! All helpers are no-ops until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one `/api/send` call. `outcome` is `ok` or `error`.
pub fn record_proxy_request(outcome: &'static str, duration: Duration) {
    counter!("workbench_proxy_requests_total", "outcome" => outcome).increment(1);
    histogram!("workbench_proxy_duration_seconds").record(duration.as_secs_f64());
}

/// Record the end of a discovery run.
pub fn record_discovery_run(outcome: &'static str) {
    counter!("workbench_discovery_runs_total", "outcome" => outcome).increment(1);
}

pub fn set_sse_subscribers(count: usize) {
    gauge!("workbench_sse_subscribers").set(count as f64);
}

pub fn record_sse_dropped(count: usize) {
    counter!("workbench_sse_events_dropped_total").increment(count as u64);
}
