// src/core/errors.rs

//! Defines the primary error type for the relay.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all failures within the relay core.
///
/// The command-misuse variants double as the text sent back to the user, so their
/// `Display` output is user facing.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("missing argument for '{0}'")]
    MissingArgument(String),

    #[error("name already taken: {0}")]
    IdentityTaken(String),

    #[error("session is not registered")]
    NotRegistered,

    #[error("session is already registered as '{0}'")]
    AlreadyRegistered(String),

    #[error("outbound queue is full")]
    QueueFull,

    #[error("session is closed")]
    SessionClosed,

    #[error("message bus is closed")]
    BusClosed,
}

impl RelayError {
    /// True for errors caused by what a user typed. These are answered with a
    /// direct reply and never treated as server faults.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RelayError::UnknownCommand(_)
                | RelayError::MissingArgument(_)
                | RelayError::IdentityTaken(_)
        )
    }
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for RelayError {
    fn clone(&self) -> Self {
        match self {
            RelayError::Io(e) => RelayError::Io(Arc::clone(e)),
            RelayError::UnknownCommand(s) => RelayError::UnknownCommand(s.clone()),
            RelayError::MissingArgument(s) => RelayError::MissingArgument(s.clone()),
            RelayError::IdentityTaken(s) => RelayError::IdentityTaken(s.clone()),
            RelayError::NotRegistered => RelayError::NotRegistered,
            RelayError::AlreadyRegistered(s) => RelayError::AlreadyRegistered(s.clone()),
            RelayError::QueueFull => RelayError::QueueFull,
            RelayError::SessionClosed => RelayError::SessionClosed,
            RelayError::BusClosed => RelayError::BusClosed,
        }
    }
}

impl PartialEq for RelayError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RelayError::Io(e1), RelayError::Io(e2)) => e1.kind() == e2.kind(),
            (RelayError::UnknownCommand(s1), RelayError::UnknownCommand(s2)) => s1 == s2,
            (RelayError::MissingArgument(s1), RelayError::MissingArgument(s2)) => s1 == s2,
            (RelayError::IdentityTaken(s1), RelayError::IdentityTaken(s2)) => s1 == s2,
            (RelayError::AlreadyRegistered(s1), RelayError::AlreadyRegistered(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Io(Arc::new(e))
    }
}
