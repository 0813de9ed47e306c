// src/core/handler/command_router.rs

//! Routes one inbound line either to the command dispatcher or onto the message bus.

use crate::connection::Session;
use crate::core::RelayError;
use crate::core::commands::{self, Command, CommandContext, ExecutableCommand};
use crate::core::metrics;
use crate::core::protocol::OutboundMessage;
use crate::core::state::ServerState;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span, warn};

/// What became of a routed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteResponse {
    /// The line was published to the bus as chat.
    Relayed,
    /// The line was a command that ran.
    Command(&'static str),
    /// The line was a command the user got wrong; a reply was sent to them.
    Rejected,
}

/// The `Router` receives inbound lines for one session.
pub struct Router<'a> {
    state: &'a Arc<ServerState>,
    session: &'a Arc<Session>,
}

impl<'a> Router<'a> {
    pub fn new(state: &'a Arc<ServerState>, session: &'a Arc<Session>) -> Self {
        Self { state, session }
    }

    /// Handles one line. The only error returned is `BusClosed`, which means the
    /// server is shutting down.
    pub async fn route(&self, line: String) -> Result<RouteResponse, RelayError> {
        let prefix = self.state.command_prefix();
        match Command::parse(&line, prefix) {
            None => self.relay(line).await,
            Some(Ok(command)) => self.execute(command).await,
            Some(Err(e)) => {
                self.reject(&e);
                Ok(RouteResponse::Rejected)
            }
        }
    }

    async fn relay(&self, text: String) -> Result<RouteResponse, RelayError> {
        let msg = OutboundMessage::chat(self.session.identity(), text);
        self.state.bus.publish(msg).await?;
        self.state.stats.increment_messages_relayed();
        metrics::MESSAGES_RELAYED_TOTAL.inc();
        Ok(RouteResponse::Relayed)
    }

    async fn execute(&self, command: Command) -> Result<RouteResponse, RelayError> {
        let name = command.name();
        let span = info_span!(
            "command",
            name = %name,
            client.addr = %self.session.addr(),
            client.id = %self.session.id(),
        );

        async move {
            self.state.stats.increment_total_commands();
            metrics::COMMANDS_PROCESSED_TOTAL.inc();

            let ctx = CommandContext {
                state: self.state,
                session: self.session,
            };
            match command.execute(&ctx).await {
                Ok(()) => Ok(RouteResponse::Command(name)),
                Err(RelayError::BusClosed) => Err(RelayError::BusClosed),
                Err(e) if e.is_user_error() => {
                    self.reject(&e);
                    Ok(RouteResponse::Rejected)
                }
                Err(RelayError::NotRegistered) => {
                    debug!("Ignoring '{}' from a session that is leaving.", name);
                    Ok(RouteResponse::Command(name))
                }
                Err(e) => {
                    warn!("Command '{}' failed: {}", name, e);
                    Ok(RouteResponse::Command(name))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Answers a user mistake directly. Misuse is not a server fault, so it is
    /// only logged at debug level.
    fn reject(&self, err: &RelayError) {
        debug!("Rejecting command from {}: {}", self.session.identity(), err);
        if let Some(reply) = commands::error_reply(err, self.state.command_prefix())
            && let Err(e) = self.session.send(reply)
        {
            debug!("Could not deliver error reply: {}", e);
        }
    }
}
