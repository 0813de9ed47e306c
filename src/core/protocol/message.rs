// src/core/protocol/message.rs

//! The shapes of everything the server writes to a client.

use bytes::Bytes;
use std::fmt;

/// The tag that marks a server-generated notice.
pub const NOTICE_PREFIX: &str = "[official notify]";

/// A single outbound line (or block of lines) before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// A relayed chat line, rendered as `<from>> <text>`.
    Chat { from: String, text: String },
    /// A system notice, rendered as `[official notify] <text>`.
    Notice(String),
    /// Preformatted text addressed to a single session, such as a usage error.
    Reply(String),
}

impl OutboundMessage {
    pub fn chat(from: impl Into<String>, text: impl Into<String>) -> Self {
        OutboundMessage::Chat {
            from: from.into(),
            text: text.into(),
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        OutboundMessage::Notice(text.into())
    }

    pub fn reply(text: impl Into<String>) -> Self {
        OutboundMessage::Reply(text.into())
    }

    /// Renders the message into its newline-terminated wire form.
    pub fn render(&self) -> String {
        let mut out = self.to_string();
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.render())
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundMessage::Chat { from, text } => write!(f, "{from}> {text}"),
            OutboundMessage::Notice(text) => write!(f, "{NOTICE_PREFIX} {text}"),
            OutboundMessage::Reply(text) => f.write_str(text),
        }
    }
}
