//! Metrics collection and exposition.
//!
//! # Metrics
//! - `store_fetch_requests_total` (counter): upstream exchanges by path and outcome
//! - `store_fetch_request_duration_seconds` (histogram): logical request latency
//! - `store_fetch_breaker_open_total` (counter): breaker openings
//! - `store_fetch_throttle_queue_depth` (gauge): pending throttled requests
//!
//! Recording is a no-op until a recorder is installed, so the library can be
//! used without ever calling [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Which leg of the pipeline produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPath {
    Direct,
    Fallback(&'static str),
}

impl FetchPath {
    fn label(self) -> &'static str {
        match self {
            FetchPath::Direct => "direct",
            FetchPath::Fallback(stage) => stage,
        }
    }
}

pub fn record_attempt(path: FetchPath, outcome: &'static str) {
    counter!(
        "store_fetch_requests_total",
        "path" => path.label(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_request_duration(start: Instant, ok: bool) {
    histogram!(
        "store_fetch_request_duration_seconds",
        "result" => if ok { "ok" } else { "error" }
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_open() {
    counter!("store_fetch_breaker_open_total").increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("store_fetch_throttle_queue_depth").set(depth as f64);
}
