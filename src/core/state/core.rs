// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared state of one
//! server instance.

use super::client::ClientMap;
use super::stats::StatsState;
use crate::config::Config;
use crate::core::bus::MessageBus;
use crate::core::presence::PresenceRegistry;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Contains the initialized state plus the receiving ends that the spawner hands
/// to background tasks.
pub struct ServerInit {
    /// The fully initialized, shared server state.
    pub state: Arc<ServerState>,
    /// The consuming end of the message bus, drained by the bus dispatcher.
    pub bus_rx: mpsc::Receiver<Bytes>,
}

/// The state shared by every task of one server instance. Nothing here is
/// process-global, so several servers can run side by side.
#[derive(Debug)]
pub struct ServerState {
    pub config: Config,
    /// Online identities and the sessions they map to.
    pub registry: PresenceRegistry,
    /// The sending side of the server-wide broadcast queue.
    pub bus: MessageBus,
    /// Every live connection, including sessions that are no longer registered
    /// but have not finished tearing down.
    pub clients: ClientMap,
    pub stats: StatsState,
    next_session_id: AtomicU64,
}

impl ServerState {
    /// Builds the state for a new server instance.
    pub fn initialize(config: Config) -> ServerInit {
        let (bus, bus_rx) = MessageBus::channel(config.bus_capacity);
        let state = Arc::new(Self {
            config,
            registry: PresenceRegistry::new(),
            bus,
            clients: ClientMap::default(),
            stats: StatsState::new(),
            next_session_id: AtomicU64::new(1),
        });
        ServerInit { state, bus_rx }
    }

    /// Allocates a session id unique within this server instance.
    pub fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn command_prefix(&self) -> &str {
        &self.config.command_prefix
    }
}
