// src/connection/supervisor.rs

//! Defines the `IdleSupervisor`, the per-session watchdog that disconnects
//! clients which stay silent for too long.

use super::session::Session;
use crate::core::metrics;
use crate::core::protocol::OutboundMessage;
use crate::core::state::ServerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// The watchdog's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Waiting for a keep-alive or for the timeout, whichever comes first.
    Armed,
    /// The timeout won; the session is being disconnected.
    TimingOut,
}

/// How a supervisor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorOutcome {
    /// This supervisor disconnected the session for inactivity.
    TimedOut,
    /// The session ended some other way first.
    Released,
}

pub struct IdleSupervisor {
    state: Arc<ServerState>,
    session: Arc<Session>,
    keepalive_rx: mpsc::Receiver<()>,
    timeout: Duration,
    grace: Duration,
}

impl IdleSupervisor {
    pub fn new(state: Arc<ServerState>, session: Arc<Session>, keepalive_rx: mpsc::Receiver<()>) -> Self {
        let timeout = state.config.idle_timeout;
        let grace = state.config.timeout_grace;
        Self {
            state,
            session,
            keepalive_rx,
            timeout,
            grace,
        }
    }

    pub async fn run(mut self) -> SupervisorOutcome {
        let mut watchdog = WatchdogState::Armed;
        while watchdog == WatchdogState::Armed {
            tokio::select! {
                biased;
                _ = self.session.closed() => return SupervisorOutcome::Released,
                signal = self.keepalive_rx.recv() => {
                    if signal.is_none() {
                        // The reader is gone and has handled the disconnect itself.
                        return SupervisorOutcome::Released;
                    }
                }
                _ = tokio::time::sleep(self.timeout) => watchdog = WatchdogState::TimingOut,
            }
        }
        self.time_out().await
    }

    async fn time_out(&self) -> SupervisorOutcome {
        if !self.session.begin_close() {
            return SupervisorOutcome::Released;
        }
        let identity = self.session.identity();
        info!(
            "{} ({}) idle for {:?}, disconnecting.",
            identity,
            self.session.addr(),
            self.timeout
        );
        self.state.stats.increment_idle_disconnects();
        metrics::IDLE_DISCONNECTS_TOTAL.inc();

        let notice = OutboundMessage::notice(format!("{identity} disconnected for inactivity"));
        if let Err(e) = self.session.send(notice) {
            debug!("Could not deliver timeout notice to {}: {}", identity, e);
        }
        if self.state.registry.remove_session(&self.session).is_some()
            && let Err(e) = self
                .state
                .bus
                .notify(format!("{identity} was disconnected for inactivity"))
                .await
        {
            debug!("Could not publish timeout notice: {}", e);
        }

        // Give the writer a moment to flush the notice before the socket goes away.
        tokio::select! {
            _ = tokio::time::sleep(self.grace) => {}
            _ = self.session.closed() => {}
        }
        self.session.offline();
        SupervisorOutcome::TimedOut
    }
}
