// src/core/presence.rs

//! The presence registry: the authoritative map of online identities to sessions.
//!
//! Every mutation takes the write lock and updates the session's `identity`
//! field while holding it, so a stored key always equals the identity of the
//! session it maps to, and a rename is never observable half-done.

use crate::connection::Session;
use crate::core::RelayError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: RwLock<HashMap<String, Arc<Session>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers `session` under `identity`. Fails without side effects if the
    /// identity is already in use, or if the session is already registered
    /// (use `rename` to move it).
    pub fn insert(&self, identity: &str, session: Arc<Session>) -> Result<(), RelayError> {
        let mut entries = self.entries.write();
        let current = session.identity();
        if entries
            .get(&current)
            .is_some_and(|entry| entry.id() == session.id())
        {
            return Err(RelayError::AlreadyRegistered(current));
        }
        if entries.contains_key(identity) {
            return Err(RelayError::IdentityTaken(identity.to_string()));
        }
        session.set_identity(identity);
        entries.insert(identity.to_string(), session);
        Ok(())
    }

    /// Removes whatever session is registered under `identity`.
    pub fn remove(&self, identity: &str) -> Option<Arc<Session>> {
        self.entries.write().remove(identity)
    }

    /// Removes `session` under its current identity, but only if that key still
    /// maps to this very session. Returns the identity it was registered under.
    pub fn remove_session(&self, session: &Session) -> Option<String> {
        let mut entries = self.entries.write();
        let identity = session.identity();
        let owned = entries
            .get(&identity)
            .is_some_and(|entry| entry.id() == session.id());
        if !owned {
            return None;
        }
        entries.remove(&identity);
        Some(identity)
    }

    pub fn lookup(&self, identity: &str) -> Option<Arc<Session>> {
        self.entries.read().get(identity).cloned()
    }

    /// Moves `session` to `new_identity` in one step and returns its old identity.
    ///
    /// Fails with `IdentityTaken` if the name is in use (including by the session
    /// itself) and with `NotRegistered` if the session has already left. State is
    /// unchanged on failure.
    pub fn rename(&self, session: &Session, new_identity: &str) -> Result<String, RelayError> {
        let mut entries = self.entries.write();
        if entries.contains_key(new_identity) {
            return Err(RelayError::IdentityTaken(new_identity.to_string()));
        }
        let old_identity = session.identity();
        let owned = entries
            .get(&old_identity)
            .is_some_and(|entry| entry.id() == session.id());
        if !owned {
            return Err(RelayError::NotRegistered);
        }
        let entry = entries
            .remove(&old_identity)
            .ok_or(RelayError::NotRegistered)?;
        entry.set_identity(new_identity);
        entries.insert(new_identity.to_string(), entry);
        Ok(old_identity)
    }

    /// The registered identities, sorted so replies are stable.
    pub fn snapshot(&self) -> Vec<String> {
        let mut identities: Vec<String> = self.entries.read().keys().cloned().collect();
        identities.sort_unstable();
        identities
    }

    /// The registered sessions at this instant, for fan-out.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.entries.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry. Used when the server shuts down.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
