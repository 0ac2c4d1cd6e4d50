//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_routes_registered_total` (counter)
//! - `gateway_routes_unregistered_total` (counter)
//! - `gateway_route_registration_failures_total` (counter)
//! - `gateway_services` (gauge): services with routes currently held
//! - `gateway_filter_rejections_total` (counter)
//! - `gateway_upstream_requests_total` (counter): by route, status
//! - `gateway_upstream_request_duration_seconds` (histogram): by route

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use super::ObservabilityError;

/// Install the Prometheus recorder and serve it on `address`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(address: &str) -> Result<(), ObservabilityError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| ObservabilityError::InvalidAddress(address.to_string()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ObservabilityError::MetricsInit(e.to_string()))?;

    describe_metrics();
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn describe_metrics() {
    describe_counter!("gateway_routes_registered_total", "Routes registered with the router");
    describe_counter!("gateway_routes_unregistered_total", "Routes removed from the router");
    describe_counter!(
        "gateway_route_registration_failures_total",
        "Endpoints the router refused to register"
    );
    describe_gauge!("gateway_services", "Services currently holding routes");
    describe_counter!("gateway_filter_rejections_total", "Requests rejected by a pre-filter");
    describe_counter!("gateway_upstream_requests_total", "Requests forwarded upstream");
    describe_histogram!(
        "gateway_upstream_request_duration_seconds",
        "Upstream request latency in seconds"
    );
}

pub fn record_route_registered() {
    counter!("gateway_routes_registered_total").increment(1);
}

pub fn record_routes_unregistered(count: usize) {
    counter!("gateway_routes_unregistered_total").increment(count as u64);
}

pub fn record_registration_failure() {
    counter!("gateway_route_registration_failures_total").increment(1);
}

pub fn set_services(count: usize) {
    gauge!("gateway_services").set(count as f64);
}

pub fn record_filter_rejection() {
    counter!("gateway_filter_rejections_total").increment(1);
}

/// Record one upstream exchange and its latency.
pub fn record_upstream_request(route: &str, status: u16, start_time: Instant) {
    let duration = start_time.elapsed().as_secs_f64();

    counter!(
        "gateway_upstream_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "gateway_upstream_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_rejected() {
        let err = init_metrics("not-an-address").unwrap_err();
        assert!(matches!(err, ObservabilityError::InvalidAddress(_)));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_route_registered();
        record_routes_unregistered(3);
        set_services(2);
        record_upstream_request("/api/x", 200, Instant::now());
    }
}
