//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by listener, method, status
//! - `router_request_duration_seconds` (histogram): latency per listener
//! - `router_websocket_sessions` (gauge): live relay sessions per listener
//!
//! Recording is a no-op until a recorder is installed, so the exporter is
//! optional.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed HTTP exchange (or upgrade handshake).
pub fn record_request(listen_port: u16, method: &str, status: u16, start: Instant) {
    let listener = listen_port.to_string();
    counter!(
        "router_requests_total",
        "listener" => listener.clone(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("router_request_duration_seconds", "listener" => listener)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_session_opened(listen_port: u16) {
    gauge!("router_websocket_sessions", "listener" => listen_port.to_string()).increment(1.0);
}

pub fn record_session_closed(listen_port: u16) {
    gauge!("router_websocket_sessions", "listener" => listen_port.to_string()).decrement(1.0);
}
