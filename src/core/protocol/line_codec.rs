// src/core/protocol/line_codec.rs

//! Implements newline-delimited framing as a `tokio_util::codec` pair.
//!
//! Inbound lines are capped at a configurable length. An over-long line is never
//! truncated and relayed: it is swallowed up to its terminator and reported once
//! as [`Inbound::Oversized`], so the connection can tell the user what happened.

use crate::core::RelayError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// A single decoded unit of inbound traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete line with its terminator (`\n` or `\r\n`) removed.
    Line(String),
    /// A line that exceeded the maximum length. Carries the number of bytes discarded.
    Oversized(usize),
}

/// A codec for `\n`-terminated UTF-8 lines.
#[derive(Debug)]
pub struct LineCodec {
    max_length: usize,
    /// Offset up to which the buffer is known not to contain a terminator.
    next_index: usize,
    /// True while the remainder of an over-long line is being skipped.
    discarding: bool,
    discarded: usize,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
            discarded: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Decoder for LineCodec {
    type Item = Inbound;
    type Error = RelayError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let search_from = self.next_index.min(src.len());
            let Some(offset) = src[search_from..].iter().position(|b| *b == LF) else {
                if self.discarding {
                    self.discarded += src.len();
                    src.clear();
                    self.next_index = 0;
                } else if src.len() > self.max_length + 1 {
                    // +1 leaves room for a trailing CR that belongs to the terminator.
                    self.discarding = true;
                    self.discarded = src.len();
                    src.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let newline = search_from + offset;
            self.next_index = 0;

            if self.discarding {
                let total = self.discarded + newline;
                src.advance(newline + 1);
                self.discarding = false;
                self.discarded = 0;
                return Ok(Some(Inbound::Oversized(total)));
            }

            let mut line = src.split_to(newline + 1);
            line.truncate(newline);
            if line.last() == Some(&CR) {
                line.truncate(line.len() - 1);
            }

            if line.len() > self.max_length {
                return Ok(Some(Inbound::Oversized(line.len())));
            }
            if line.is_empty() {
                // A bare terminator carries no input.
                continue;
            }
            return Ok(Some(Inbound::Line(
                String::from_utf8_lossy(&line).into_owned(),
            )));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if !src.is_empty() {
            debug!(
                "Discarding {} bytes of an unterminated line at end of stream.",
                src.len()
            );
            src.clear();
        }
        self.next_index = 0;
        self.discarding = false;
        self.discarded = 0;
        Ok(None)
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = RelayError;

    /// Writes the payload, appending a terminator if the payload lacks one.
    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        let terminated = item.last() == Some(&LF);
        dst.put(item);
        if !terminated {
            dst.put_u8(LF);
        }
        Ok(())
    }
}
