//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_rewrites_total` (counter): rewritten bodies by content kind
//! - `proxy_upstream_errors_total` (counter): fetch failures by strategy

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must run inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one handled request.
///
/// `outcome` is `proxied`, `passthrough`, `rejected` or `failed`.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();

    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!("proxy_request_duration_seconds", "outcome" => outcome).record(elapsed);
}

pub fn record_rewrite(kind: &'static str) {
    counter!("proxy_rewrites_total", "kind" => kind).increment(1);
}

pub fn record_upstream_error(strategy: &'static str) {
    counter!("proxy_upstream_errors_total", "strategy" => strategy).increment(1);
}
