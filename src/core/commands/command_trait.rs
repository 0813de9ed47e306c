// src/core/commands/command_trait.rs

//! Defines the core traits for all executable commands.

use crate::connection::Session;
use crate::core::RelayError;
use crate::core::protocol::OutboundMessage;
use crate::core::state::ServerState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Everything a command may touch: the server and the session that invoked it.
pub struct CommandContext<'a> {
    pub state: &'a Arc<ServerState>,
    pub session: &'a Arc<Session>,
}

impl CommandContext<'_> {
    /// Sends a message to the invoking session only. A reply that cannot be
    /// queued is lost, which only happens for a closing or saturated session.
    pub fn reply(&self, msg: OutboundMessage) {
        if let Err(e) = self.session.send(msg) {
            debug!("Dropping reply to {}: {}", self.session.identity(), e);
        }
    }
}

/// A trait for parsing a command from its whitespace-separated arguments
/// (everything after the verb).
pub trait ParseCommand: Sized {
    fn parse(args: &[&str]) -> Result<Self, RelayError>;
}

/// A trait for commands that can be executed against the server state.
#[async_trait]
pub trait ExecutableCommand {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), RelayError>;
}
