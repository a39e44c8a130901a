//! Metrics collection and exposition.
//!
//! # Metrics
//! - `supervisor_service_starts_total` (counter): start attempts by service, outcome
//! - `supervisor_service_stops_total` (counter): stops by service, outcome
//! - `supervisor_services_running` (gauge): services currently started
//! - `supervisor_cancellations_total` (counter): run cancellations by cause
//! - `chain_head_block` (gauge): last block seen by the chain monitor
//! - `chain_rpc_health` (gauge): 1=reachable, 0=unreachable
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_service_start(service: &str, outcome: &'static str) {
    counter!(
        "supervisor_service_starts_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_service_stop(service: &str, ok: bool) {
    counter!(
        "supervisor_service_stops_total",
        "service" => service.to_string(),
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}

pub fn set_running_services(count: usize) {
    gauge!("supervisor_services_running").set(count as f64);
}

pub fn record_cancellation(cause: &'static str) {
    counter!("supervisor_cancellations_total", "cause" => cause).increment(1);
}

pub fn record_chain_head(block: u64) {
    gauge!("chain_head_block").set(block as f64);
}

pub fn record_rpc_health(healthy: bool) {
    gauge!("chain_rpc_health").set(if healthy { 1.0 } else { 0.0 });
}
