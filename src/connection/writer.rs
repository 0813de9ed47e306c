// src/connection/writer.rs

//! Defines the `SessionWriter`, the writing side of a client connection.

use super::session::Session;
use crate::core::protocol::LineCodec;
use bytes::Bytes;
use futures::SinkExt;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tracing::{debug, warn};

/// Drains a session's outbound queue onto the socket.
///
/// Delivery is best effort: a failed write is logged and the message is lost,
/// but the writer keeps going. It stops when the queue is closed, then shuts the
/// socket down.
pub struct SessionWriter<W: AsyncWrite + Unpin> {
    framed: FramedWrite<W, LineCodec>,
    rx: mpsc::Receiver<Bytes>,
    session: Arc<Session>,
}

impl<W: AsyncWrite + Unpin> SessionWriter<W> {
    pub fn new(writer: W, rx: mpsc::Receiver<Bytes>, session: Arc<Session>, max_line_length: usize) -> Self {
        Self {
            framed: FramedWrite::new(writer, LineCodec::new(max_line_length)),
            rx,
            session,
        }
    }

    /// Runs until the outbound queue is closed. Returns the number of messages written.
    pub async fn run(mut self) -> usize {
        let mut written = 0;
        while let Some(payload) = self.rx.recv().await {
            tokio::select! {
                biased;
                result = self.framed.send(payload) => match result {
                    Ok(()) => written += 1,
                    Err(e) => {
                        warn!("Failed to write to {}: {}", self.session.addr(), e);
                        // Forget the unsent bytes so a later message is not preceded by a stale fragment.
                        self.framed.write_buffer_mut().clear();
                    }
                },
                _ = self.session.closed() => {
                    debug!("Abandoning a stalled write to {}.", self.session.addr());
                    break;
                }
            }
        }

        if let Err(e) = self.framed.get_mut().shutdown().await {
            debug!("Error shutting down socket for {}: {}", self.session.addr(), e);
        }
        debug!("Writer for {} finished after {} messages.", self.session.addr(), written);
        written
    }
}
