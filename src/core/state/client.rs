// src/core/state/client.rs

//! Contains state definitions related to client connections.

use crate::connection::Session;
use dashmap::DashMap;
use std::sync::Arc;

/// Every live connection keyed by session id, registered or not.
pub type ClientMap = Arc<DashMap<u64, Arc<Session>>>;
