// src/core/commands/rename.rs

use crate::core::RelayError;
use crate::core::commands::command_trait::{CommandContext, ExecutableCommand, ParseCommand};
use async_trait::async_trait;
use tracing::info;

/// Changes the caller's identity and announces the change to everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rename {
    pub new_identity: String,
}

impl ParseCommand for Rename {
    fn parse(args: &[&str]) -> Result<Self, RelayError> {
        match args.first() {
            Some(name) if !name.is_empty() => Ok(Rename {
                new_identity: (*name).to_string(),
            }),
            _ => Err(RelayError::MissingArgument("rename".into())),
        }
    }
}

#[async_trait]
impl ExecutableCommand for Rename {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), RelayError> {
        let old_identity = ctx
            .state
            .registry
            .rename(ctx.session, &self.new_identity)?;
        info!(
            "{} ({}) renamed to {}",
            old_identity,
            ctx.session.addr(),
            self.new_identity
        );
        ctx.state
            .bus
            .notify(format!("{old_identity} renamed to {}", self.new_identity))
            .await
    }
}
