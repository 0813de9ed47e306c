// src/core/protocol/mod.rs

//! The line-oriented wire protocol: inbound line framing and outbound message shapes.

pub mod line_codec;
pub mod message;
pub use line_codec::{Inbound, LineCodec};
pub use message::{NOTICE_PREFIX, OutboundMessage};
