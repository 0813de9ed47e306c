// src/core/commands/mod.rs

//! The inline commands a client can issue, and the central `Command` enum that
//! encapsulates their parsed state.
//!
//! A line is a command when it begins with the configured prefix as a whole
//! token, with no leading whitespace; the verb and its arguments follow. Verbs
//! are case-sensitive.

use crate::core::RelayError;
use crate::core::protocol::OutboundMessage;
use async_trait::async_trait;

pub mod command_trait;
pub mod online;
pub mod rename;

pub use command_trait::{CommandContext, ExecutableCommand, ParseCommand};
pub use online::Online;
pub use rename::Rename;

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Online(Online),
    Rename(Rename),
}

impl Command {
    /// Parses `line` as a command. Returns `None` if the line is ordinary chat.
    pub fn parse(line: &str, prefix: &str) -> Option<Result<Command, RelayError>> {
        if !line.starts_with(prefix) {
            return None;
        }
        let mut tokens = line.split_whitespace();
        if tokens.next()? != prefix {
            return None;
        }
        let args: Vec<&str> = tokens.collect();
        Some(Self::from_args(&args))
    }

    /// Parses a verb followed by its arguments.
    pub fn from_args(args: &[&str]) -> Result<Command, RelayError> {
        let Some((verb, rest)) = args.split_first() else {
            return Err(RelayError::UnknownCommand(String::new()));
        };
        match *verb {
            "online" => Online::parse(rest).map(Command::Online),
            "rename" => Rename::parse(rest).map(Command::Rename),
            other => Err(RelayError::UnknownCommand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Online(_) => "online",
            Command::Rename(_) => "rename",
        }
    }
}

#[async_trait]
impl ExecutableCommand for Command {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), RelayError> {
        match self {
            Command::Online(cmd) => cmd.execute(ctx).await,
            Command::Rename(cmd) => cmd.execute(ctx).await,
        }
    }
}

/// The reply for any malformed or unknown command.
pub fn usage(prefix: &str) -> OutboundMessage {
    OutboundMessage::reply(format!(
        "[!] invalid command, usage:\n- {prefix} online\n- {prefix} rename <name>\n"
    ))
}

/// Maps a user-caused command error to the text sent back to that user.
pub fn error_reply(err: &RelayError, prefix: &str) -> Option<OutboundMessage> {
    match err {
        RelayError::UnknownCommand(_) | RelayError::MissingArgument(_) => Some(usage(prefix)),
        RelayError::IdentityTaken(name) => Some(OutboundMessage::reply(format!(
            "[!] name already taken: {name}"
        ))),
        _ => None,
    }
}
