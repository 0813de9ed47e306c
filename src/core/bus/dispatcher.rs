// src/core/bus/dispatcher.rs

//! The background task that drains the message bus and fans each message out.

use crate::config::OverflowPolicy;
use crate::core::RelayError;
use crate::core::metrics;
use crate::core::protocol::OutboundMessage;
use crate::core::state::ServerState;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// The result of delivering one bus message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Sessions whose queue accepted the message.
    pub delivered: usize,
    /// Sessions that missed the message because their queue was full.
    pub dropped: usize,
    /// Sessions torn down under `OverflowPolicy::Disconnect`.
    pub disconnected: usize,
}

/// The single consumer of the message bus.
pub struct BusDispatcherTask {
    state: Arc<ServerState>,
    rx: mpsc::Receiver<Bytes>,
}

impl BusDispatcherTask {
    pub fn new(state: Arc<ServerState>, rx: mpsc::Receiver<Bytes>) -> Self {
        Self { state, rx }
    }

    /// The main run loop. Stops on shutdown or when every producer is gone.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Message bus dispatcher started.");
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Message bus dispatcher shutting down.");
                    return;
                }
                msg = self.rx.recv() => match msg {
                    Some(payload) => {
                        fan_out(&self.state, payload);
                    }
                    None => {
                        info!("Message bus closed, dispatcher exiting.");
                        return;
                    }
                }
            }
        }
    }
}

/// Appends `payload` to the outbound queue of every registered session.
///
/// Never waits on a session: a full queue is handled by the configured
/// `OverflowPolicy`, so one stalled client cannot delay everybody else.
pub fn fan_out(state: &ServerState, payload: Bytes) -> FanOut {
    let mut outcome = FanOut::default();
    for session in state.registry.sessions() {
        match session.deliver(payload.clone()) {
            Ok(()) => outcome.delivered += 1,
            Err(RelayError::QueueFull) => {
                state.stats.increment_dropped_messages();
                metrics::OUTBOUND_DROPPED_TOTAL.inc();
                match state.config.overflow_policy {
                    OverflowPolicy::Drop => {
                        debug!(
                            "Outbound queue full for {}, dropping message.",
                            session.identity()
                        );
                        outcome.dropped += 1;
                    }
                    OverflowPolicy::Disconnect => {
                        if !session.begin_close() {
                            outcome.dropped += 1;
                            continue;
                        }
                        let identity = state.registry.remove_session(&session);
                        session.offline();
                        outcome.disconnected += 1;
                        if let Some(identity) = identity {
                            warn!("Disconnecting {} ({}): outbound queue full.", identity, session.addr());
                            let notice = OutboundMessage::notice(format!(
                                "{identity} was disconnected (too slow)"
                            ));
                            if let Err(e) = state.bus.try_publish(notice) {
                                debug!("Could not publish slow-client notice: {}", e);
                            }
                        }
                    }
                }
            }
            Err(e) => {
                // The session closed between the snapshot and the delivery.
                debug!("Skipping delivery to {}: {}", session.identity(), e);
            }
        }
    }
    outcome
}
