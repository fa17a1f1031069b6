//! Metrics collection and exposition.
//!
//! # Metrics
//! - `oracle_price_fetch_total` (counter): price fetches by pair, outcome
//! - `oracle_requests_total` (counter): on-chain requests by outcome
//! - `oracle_fulfillments_total` (counter): fulfillment transactions by outcome
//! - `oracle_listener_state` (gauge): 0=init, 1=subscribed, 2=polling, 3=halted, 4=stopped
//! - `oracle_node_connected` (gauge): 1=connected, 0=disconnected
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_price_fetch(pair: &str, outcome: &'static str) {
    counter!("oracle_price_fetch_total", "pair" => pair.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_request(outcome: &'static str) {
    counter!("oracle_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_fulfillment(outcome: &'static str) {
    counter!("oracle_fulfillments_total", "outcome" => outcome).increment(1);
}

pub fn record_listener_state(code: u8) {
    gauge!("oracle_listener_state").set(code as f64);
}

pub fn record_node_connected(connected: bool) {
    gauge!("oracle_node_connected").set(if connected { 1.0 } else { 0.0 });
}
