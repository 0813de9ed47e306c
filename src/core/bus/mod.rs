// src/core/bus/mod.rs

//! The message bus: the single ordered queue every broadcast passes through.
//!
//! Producers (connection readers, command handlers, the idle supervisor) publish
//! rendered lines; one `BusDispatcherTask` drains the queue and copies each line
//! into the outbound queue of every registered session. Because there is exactly
//! one consumer and each outbound queue is FIFO, every session sees bus messages
//! in bus order.

use crate::core::RelayError;
use crate::core::protocol::OutboundMessage;
use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

pub mod dispatcher;

pub use dispatcher::{BusDispatcherTask, FanOut, fan_out};

/// The cloneable producer side of the bus.
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: mpsc::Sender<Bytes>,
}

impl MessageBus {
    /// Creates a bus with room for `capacity` undelivered messages.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Publishes a message, waiting for room if the bus is full.
    pub async fn publish(&self, msg: OutboundMessage) -> Result<(), RelayError> {
        self.tx
            .send(msg.into_bytes())
            .await
            .map_err(|_| RelayError::BusClosed)
    }

    /// Publishes a system notice.
    pub async fn notify(&self, text: impl Into<String>) -> Result<(), RelayError> {
        self.publish(OutboundMessage::notice(text)).await
    }

    /// Publishes without waiting. Used from the dispatcher itself, which must
    /// never block on its own queue.
    pub fn try_publish(&self, msg: OutboundMessage) -> Result<(), RelayError> {
        self.tx.try_send(msg.into_bytes()).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::QueueFull,
            TrySendError::Closed(_) => RelayError::BusClosed,
        })
    }
}
