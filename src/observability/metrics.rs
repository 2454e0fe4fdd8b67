//! Metrics collection and exposition.
//!
//! # Metrics
//! - `user_service_requests_total` (counter): requests by method, route, status
//! - `user_service_request_duration_seconds` (histogram): latency distribution
//! - `circuit_breaker_calls_total` (counter): guarded calls by breaker, outcome
//! - `circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `user_events_published_total` (counter): dispatched events by type
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    ::metrics::counter!(
        "user_service_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "user_service_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_call(breaker: &str, outcome: &'static str) {
    ::metrics::counter!(
        "circuit_breaker_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    ::metrics::gauge!("circuit_breaker_state", "breaker" => breaker.to_string()).set(state.gauge_value());
}

pub fn record_user_event(event_type: &'static str) {
    ::metrics::counter!("user_events_published_total", "event_type" => event_type).increment(1);
}
