// src/core/commands/online.rs

use crate::core::RelayError;
use crate::core::commands::command_trait::{CommandContext, ExecutableCommand, ParseCommand};
use crate::core::protocol::OutboundMessage;
use async_trait::async_trait;

/// Lists the identities that are online, replying to the caller only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Online;

impl ParseCommand for Online {
    fn parse(_args: &[&str]) -> Result<Self, RelayError> {
        Ok(Online)
    }
}

#[async_trait]
impl ExecutableCommand for Online {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), RelayError> {
        let identities = ctx.state.registry.snapshot();
        ctx.reply(render_online(&identities));
        Ok(())
    }
}

/// Formats the `online` reply: a header and one `- <name>` line per identity.
pub fn render_online(identities: &[String]) -> OutboundMessage {
    if identities.is_empty() {
        return OutboundMessage::notice("no users online");
    }
    let mut text = format!("online users ({}):", identities.len());
    for identity in identities {
        text.push_str("\n- ");
        text.push_str(identity);
    }
    OutboundMessage::notice(text)
}
