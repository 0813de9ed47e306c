// src/core/state/stats.rs

//! Contains state definitions and logic for server statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Holds all state and logic related to server-wide statistics and monitoring.
#[derive(Debug)]
pub struct StatsState {
    /// The total number of connections accepted by the server since startup.
    total_connections: AtomicU64,
    /// The total number of chat lines relayed through the message bus.
    messages_relayed: AtomicU64,
    /// The total number of commands processed by the server since startup.
    total_commands: AtomicU64,
    /// Per-session deliveries skipped because an outbound queue was full.
    dropped_messages: AtomicU64,
    /// Sessions disconnected by the idle supervisor.
    idle_disconnects: AtomicU64,
}

impl Default for StatsState {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsState {
    /// Creates a new `StatsState` with initialized counters.
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            messages_relayed: AtomicU64::new(0),
            total_commands: AtomicU64::new(0),
            dropped_messages: AtomicU64::new(0),
            idle_disconnects: AtomicU64::new(0),
        }
    }

    /// Atomically increments the total number of connections received.
    pub fn increment_total_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the total number of connections received.
    pub fn get_total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn increment_messages_relayed(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_messages_relayed(&self) -> u64 {
        self.messages_relayed.load(Ordering::Relaxed)
    }

    /// Atomically increments the total number of commands processed.
    pub fn increment_total_commands(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the total number of commands processed.
    pub fn get_total_commands(&self) -> u64 {
        self.total_commands.load(Ordering::Relaxed)
    }

    pub fn increment_dropped_messages(&self) {
        self.dropped_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_dropped_messages(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    pub fn increment_idle_disconnects(&self) {
        self.idle_disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_idle_disconnects(&self) -> u64 {
        self.idle_disconnects.load(Ordering::Relaxed)
    }
}
