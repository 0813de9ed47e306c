// src/core/mod.rs

//! The central module containing the relay's shared state and logic: the
//! presence registry, the message bus, commands, and the wire protocol.

pub mod bus;
pub mod commands;
pub mod errors;
pub mod handler;
pub mod metrics;
pub mod presence;
pub mod protocol;
pub mod state;

pub use commands::Command;
pub use errors::RelayError;
pub use presence::PresenceRegistry;
