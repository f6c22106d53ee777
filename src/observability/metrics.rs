//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by service, method, status
//! - `gateway_request_duration_seconds` (histogram): latency per service
//! - `gateway_rate_limited_total` (counter): 429s per service
//! - `gateway_auth_denied_total` (counter): 401s per service
//! - `gateway_upstream_errors_total` (counter): backend failures by kind
//! - `gateway_rate_limit_entries` (gauge): live rate-limit buckets
//!
//! Without an installed recorder every call is a no-op. Label values come
//! from configuration or fixed sets, never from raw request data.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::RouteMiss;

/// `service` label for requests whose path names no configured service.
pub const UNKNOWN_SERVICE: &str = "unknown";

static STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::CONNECT,
    Method::TRACE,
];

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// `method` label: the method name for standard methods, `OTHER` otherwise.
pub fn method_label(method: &Method) -> &'static str {
    STANDARD_METHODS
        .iter()
        .find(|standard| *standard == method)
        .map(|standard| standard.as_str())
        .unwrap_or("OTHER")
}

/// `service` label for a request that did not resolve.
pub fn service_label(miss: &RouteMiss) -> &str {
    match miss {
        RouteMiss::UnknownService { .. } => UNKNOWN_SERVICE,
        RouteMiss::NoMatchingRoute { service, .. } => service,
    }
}

pub fn record_request(service: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(service: &str) {
    metrics::counter!("gateway_rate_limited_total", "service" => service.to_string()).increment(1);
}

pub fn record_auth_denied(service: &str) {
    metrics::counter!("gateway_auth_denied_total", "service" => service.to_string()).increment(1);
}

pub fn record_upstream_error(service: &str, kind: &'static str) {
    metrics::counter!(
        "gateway_upstream_errors_total",
        "service" => service.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_rate_limit_entries(count: usize) {
    metrics::gauge!("gateway_rate_limit_entries").set(count as f64);
}
