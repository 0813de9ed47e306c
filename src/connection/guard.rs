// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use super::session::Session;
use crate::core::metrics;
use crate::core::state::ServerState;
use std::sync::Arc;
use tracing::{debug, warn};

/// An RAII guard to ensure connection resources are always cleaned up when a
/// connection's tasks finish, however they finish.
pub struct ConnectionGuard {
    /// A shared reference to the server state.
    pub(crate) state: Arc<ServerState>,
    /// The session this guard cleans up after.
    pub(crate) session: Arc<Session>,
}

impl ConnectionGuard {
    /// Creates a new `ConnectionGuard` and counts the connection as live.
    pub(crate) fn new(state: Arc<ServerState>, session: Arc<Session>) -> Self {
        state.clients.insert(session.id(), session.clone());
        metrics::CONNECTED_CLIENTS.inc();
        Self { state, session }
    }
}

impl Drop for ConnectionGuard {
    /// Removes the session from the connection table. A session still registered
    /// at this point lost its tasks abnormally (a panic or an abort), so it is
    /// deregistered and torn down here.
    fn drop(&mut self) {
        metrics::CONNECTED_CLIENTS.dec();
        debug!(
            "ConnectionGuard dropping, cleaning up resources for connection {}",
            self.session.addr()
        );

        if let Some(identity) = self.state.registry.remove_session(&self.session) {
            warn!(
                "Session {} ({}) ended without a clean teardown.",
                identity,
                self.session.addr()
            );
        }
        self.session.offline();

        if self.state.clients.remove(&self.session.id()).is_none() {
            debug!(
                "Client {} was not in the connection table upon cleanup.",
                self.session.addr()
            );
        }
    }
}
