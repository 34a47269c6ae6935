//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by route, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency by route
//! - `gateway_upstream_calls_total` (counter): dependency calls by outcome
//! - `gateway_upstream_duration_seconds` (histogram): dependency latency
//! - `gateway_injected_failures_total` (counter): chaos short-circuits by route
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder (tests, disabled config) every call is a no-op
//! - Prometheus exporter owns its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    let route = route.to_string();
    counter!(
        "gateway_requests_total",
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// `outcome` is `"ok"` or an error kind name.
pub fn record_upstream_call(dependency: &str, outcome: &'static str, start: Instant) {
    let dependency = dependency.to_string();
    counter!(
        "gateway_upstream_calls_total",
        "dependency" => dependency.clone(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gateway_upstream_duration_seconds", "dependency" => dependency)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_injected_failure(route: &str) {
    counter!("gateway_injected_failures_total", "route" => route.to_string()).increment(1);
}
