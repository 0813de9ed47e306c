// src/connection/session.rs

//! Defines the `Session` handle shared by a connection's tasks, the presence
//! registry, and the message bus.

use crate::core::RelayError;
use crate::core::protocol::OutboundMessage;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;

/// The lifecycle of a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered and relaying traffic.
    Active,
    /// A teardown path has claimed the session; inbound traffic is ignored.
    Closing,
    /// The outbound queue is closed and the connection tasks have been told to stop.
    Closed,
}

/// The server-side handle for one connected client.
///
/// The socket halves are owned by the connection's reader and writer tasks. The
/// handle controls them indirectly: closing the outbound queue ends the writer,
/// and the `Closed` state ends the reader and interrupts a stalled write.
pub struct Session {
    id: u64,
    addr: SocketAddr,
    /// Only the presence registry writes this, while holding its own lock.
    identity: RwLock<String>,
    outbound: Mutex<Option<mpsc::Sender<Bytes>>>,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// Creates a session whose identity is its remote endpoint. Returns the handle
    /// and the receiving end of its outbound queue.
    pub fn new(id: u64, addr: SocketAddr, queue_capacity: usize) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let (state, _) = watch::channel(SessionState::Active);
        let session = Arc::new(Self {
            id,
            addr,
            identity: RwLock::new(addr.to_string()),
            outbound: Mutex::new(Some(tx)),
            state,
        });
        (session, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The current display identity.
    pub fn identity(&self) -> String {
        self.identity.read().clone()
    }

    pub(crate) fn set_identity(&self, identity: &str) {
        *self.identity.write() = identity.to_string();
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Appends a rendered payload to the outbound queue without waiting.
    pub fn deliver(&self, payload: Bytes) -> Result<(), RelayError> {
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return Err(RelayError::SessionClosed);
        };
        tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::QueueFull,
            TrySendError::Closed(_) => RelayError::SessionClosed,
        })
    }

    /// Renders and queues a message for this session only.
    pub fn send(&self, msg: OutboundMessage) -> Result<(), RelayError> {
        self.deliver(msg.into_bytes())
    }

    /// Claims the session for teardown. Exactly one caller ever gets `true`; the
    /// loser must leave deregistration and notices to the winner.
    pub fn begin_close(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Active {
                *state = SessionState::Closing;
                true
            } else {
                false
            }
        })
    }

    /// Tears the session down: marks it `Closed`, which stops the reader, and
    /// closes the outbound queue, which lets the writer drain and shut the socket.
    ///
    /// Safe to call any number of times from any task. Returns `true` only for the
    /// call that performed the teardown.
    pub fn offline(&self) -> bool {
        let transitioned = self.state.send_if_modified(|state| {
            if *state == SessionState::Closed {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        });
        if transitioned {
            self.outbound.lock().take();
        }
        transitioned
    }

    /// Resolves once the session reaches `Closed`. Resolves immediately if it
    /// already has.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so `wait_for` cannot observe a dropped channel.
        let _ = rx.wait_for(|state| *state == SessionState::Closed).await;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("identity", &*self.identity.read())
            .field("state", &self.state())
            .finish()
    }
}
