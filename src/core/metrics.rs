// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, TextEncoder, register_counter, register_gauge};

lazy_static! {
    // --- Server-wide Gauges ---
    /// The number of clients currently connected to the server.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("relaychat_connected_clients", "Number of currently connected clients.").unwrap();
    /// The number of identities currently in the presence registry.
    pub static ref ONLINE_IDENTITIES: Gauge =
        register_gauge!("relaychat_online_identities", "Number of registered identities.").unwrap();

    // --- Server-wide Counters ---
    /// The total number of connections accepted by the server since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("relaychat_connections_received_total", "Total number of connections received.").unwrap();
    /// The total number of connections turned away because the server was full.
    pub static ref CONNECTIONS_REJECTED_TOTAL: Counter =
        register_counter!("relaychat_connections_rejected_total", "Total number of connections rejected at max_clients.").unwrap();
    /// The total number of chat lines published to the message bus.
    pub static ref MESSAGES_RELAYED_TOTAL: Counter =
        register_counter!("relaychat_messages_relayed_total", "Total number of chat lines relayed.").unwrap();
    /// The total number of commands processed by the server since startup.
    pub static ref COMMANDS_PROCESSED_TOTAL: Counter =
        register_counter!("relaychat_commands_processed_total", "Total number of commands processed.").unwrap();
    /// Deliveries skipped because a session's outbound queue was full.
    pub static ref OUTBOUND_DROPPED_TOTAL: Counter =
        register_counter!("relaychat_outbound_dropped_total", "Total number of per-session deliveries dropped on overflow.").unwrap();
    /// Sessions closed by the idle supervisor.
    pub static ref IDLE_DISCONNECTS_TOTAL: Counter =
        register_counter!("relaychat_idle_disconnects_total", "Total number of sessions disconnected for inactivity.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
