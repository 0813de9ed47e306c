// src/connection/handler.rs

//! Defines the `ConnectionHandler`, the reading side of a client connection.

use super::session::Session;
use crate::core::RelayError;
use crate::core::handler::Router;
use crate::core::protocol::{Inbound, LineCodec, OutboundMessage};
use crate::core::state::ServerState;
use bytes::BytesMut;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::codec::Decoder;
use tracing::{debug, info, warn};

/// Pause after the first failed read. Doubles with every further failure in a row.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(10);
const MAX_READ_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Why the read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the stream or reset the connection.
    Eof,
    /// Another path (idle timeout, overflow, shutdown) closed the session.
    Closed,
}

/// Reads lines from a client and routes them.
pub struct ConnectionHandler<R> {
    reader: R,
    buffer: BytesMut,
    codec: LineCodec,
    read_buffer_size: usize,
    session: Arc<Session>,
    state: Arc<ServerState>,
    keepalive_tx: mpsc::Sender<()>,
}

impl<R: AsyncRead + Unpin> ConnectionHandler<R> {
    pub fn new(
        reader: R,
        session: Arc<Session>,
        state: Arc<ServerState>,
        keepalive_tx: mpsc::Sender<()>,
    ) -> Self {
        let read_buffer_size = state.config.read_buffer_size;
        let codec = LineCodec::new(state.config.max_line_length);
        Self {
            reader,
            buffer: BytesMut::with_capacity(read_buffer_size),
            codec,
            read_buffer_size,
            session,
            state,
            keepalive_tx,
        }
    }

    /// The main read loop. Returns once the connection is over, after having
    /// performed the disconnect teardown if this path owns it.
    pub async fn run(mut self) -> DisconnectReason {
        let mut chunk = vec![0u8; self.read_buffer_size];
        let mut consecutive_errors: u32 = 0;

        let reason = loop {
            tokio::select! {
                biased;
                _ = self.session.closed() => break DisconnectReason::Closed,
                result = self.reader.read(&mut chunk) => match result {
                    Ok(0) => {
                        if let Ok(Some(item)) = self.codec.decode_eof(&mut self.buffer) {
                            debug!("Ignoring {:?} decoded at end of stream.", item);
                        }
                        break DisconnectReason::Eof;
                    }
                    Ok(n) => {
                        consecutive_errors = 0;
                        self.buffer.extend_from_slice(&chunk[..n]);
                        if let Err(e) = self.process_buffer().await {
                            debug!("Stopping reader for {}: {}", self.session.addr(), e);
                            break DisconnectReason::Closed;
                        }
                    }
                    Err(e) if is_normal_disconnect(&e) => {
                        debug!("Connection from {} closed by peer: {}", self.session.addr(), e);
                        break DisconnectReason::Eof;
                    }
                    Err(e) => {
                        // Transient errors never end the session; back off and read again.
                        consecutive_errors = consecutive_errors.saturating_add(1);
                        warn!("Read error for {}: {}", self.session.addr(), e);
                        tokio::select! {
                            _ = self.session.closed() => break DisconnectReason::Closed,
                            _ = tokio::time::sleep(read_error_backoff(consecutive_errors)) => {}
                        }
                    }
                }
            }
        };

        if reason != DisconnectReason::Closed {
            self.disconnect().await;
        }
        reason
    }

    /// Routes every complete line currently buffered.
    async fn process_buffer(&mut self) -> Result<(), RelayError> {
        while let Some(item) = self.codec.decode(&mut self.buffer)? {
            if !self.session.is_active() {
                // Closing sessions are no longer registered; their input goes nowhere.
                continue;
            }
            // Any complete line counts as activity. A full slot already re-arms the timer.
            let _ = self.keepalive_tx.try_send(());

            match item {
                Inbound::Line(line) => {
                    Router::new(&self.state, &self.session).route(line).await?;
                }
                Inbound::Oversized(len) => {
                    debug!(
                        "Discarded a {} byte line from {}.",
                        len,
                        self.session.addr()
                    );
                    let notice = OutboundMessage::reply(format!(
                        "[!] line too long (max {} bytes), discarded",
                        self.codec.max_length()
                    ));
                    if let Err(e) = self.session.send(notice) {
                        debug!("Could not deliver line-length notice: {}", e);
                    }
                }
            }
        }
        Ok(())
    }

    /// The peer went away: deregister, tell everyone, and tear the session down.
    async fn disconnect(&self) {
        if !self.session.begin_close() {
            // The idle supervisor or the fan-out already owns the teardown.
            return;
        }
        if let Some(identity) = self.state.registry.remove_session(&self.session) {
            info!("{} ({}) went offline.", identity, self.session.addr());
            if let Err(e) = self.state.bus.notify(format!("{identity} went offline")).await {
                debug!("Could not publish offline notice: {}", e);
            }
        }
        self.session.offline();
    }
}

fn read_error_backoff(consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(16);
    READ_ERROR_BACKOFF
        .saturating_mul(1 << exponent)
        .min(MAX_READ_ERROR_BACKOFF)
}

/// Helper function to check for non-critical disconnection errors.
pub(crate) fn is_normal_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    )
}
