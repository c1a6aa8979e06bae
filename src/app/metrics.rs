//! Prometheus-based metrics module
//!
//! Provides metrics collection using Prometheus client library.
//! All metrics are exposed via the web server's /metrics endpoint.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // === Registry Metrics ===

    /// Attached IRC clients
    pub static ref CLIENTS_CONNECTED: IntGauge = IntGauge::new(
        "sputnik_clients_connected",
        "Number of currently attached IRC clients"
    ).unwrap();

    /// Registered network sessions
    pub static ref NETWORKS_REGISTERED: IntGauge = IntGauge::new(
        "sputnik_networks_registered",
        "Number of network sessions in the registry"
    ).unwrap();

    // === Dial Metrics ===

    /// Outbound connection attempts
    pub static ref DIALS_TOTAL: IntCounter = IntCounter::new(
        "sputnik_dials_total",
        "Total number of outbound network dial attempts"
    ).unwrap();

    /// Failed outbound connection attempts
    pub static ref DIAL_FAILURES: IntCounter = IntCounter::new(
        "sputnik_dial_failures_total",
        "Total number of failed network dials"
    ).unwrap();

    // === Traffic Metrics ===

    /// Lines queued for the wire
    pub static ref LINES_SENT: IntCounter = IntCounter::new(
        "sputnik_lines_sent_total",
        "Total protocol lines sent by all sessions"
    ).unwrap();

    /// Lines read off the wire
    pub static ref LINES_RECEIVED: IntCounter = IntCounter::new(
        "sputnik_lines_received_total",
        "Total protocol lines received by all sessions"
    ).unwrap();
}

/// Initialize and register all metrics with the global registry
pub fn init_metrics() {
    REGISTRY.register(Box::new(CLIENTS_CONNECTED.clone())).ok();
    REGISTRY.register(Box::new(NETWORKS_REGISTERED.clone())).ok();

    REGISTRY.register(Box::new(DIALS_TOTAL.clone())).ok();
    REGISTRY.register(Box::new(DIAL_FAILURES.clone())).ok();

    REGISTRY.register(Box::new(LINES_SENT.clone())).ok();
    REGISTRY.register(Box::new(LINES_RECEIVED.clone())).ok();
}

/// Render every registered metric in the Prometheus text format
pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}
