//! SessionRegistry: the set of active session names.
//!
//! A session has no record of its own beyond its name.  Membership is never
//! stored here; it is computed from the [`ClientRegistry`] as "every client
//! whose current session equals this name".
//!
//! # Session lifecycle
//!
//! ```text
//! create(name) ──►  active  ──►  last member leaves / disconnects
//!                                        │
//!                              remove_if_empty(name)  ──►  gone
//! ```
//!
//! # Lock ordering
//!
//! [`SessionRegistry::remove_if_empty`] needs both registries.  It asks the
//! client registry first (taking and releasing that lock) and only then takes
//! the session lock, so no code path ever holds both locks at once and a
//! circular wait is impossible.
//!
//! The price is a small window between the membership check and the removal:
//! a client that joins inside that window is left pointing at a removed
//! session.  Its next `JOIN`/`NEW_SESS` still works once it leaves.

use std::collections::BTreeSet;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::client_registry::ClientRegistry;

/// Error type for session registry operations.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("session {0} already exists")]
    AlreadyExists(String),
}

/// Set of currently active session names.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<BTreeSet<String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn exists(&self, name: &str) -> bool {
        self.sessions.lock().await.contains(name)
    }

    /// Marks `name` as active.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyExists`] if the session is already
    /// active; the check and insert are atomic.
    pub async fn create(&self, name: &str) -> Result<(), SessionError> {
        if self.sessions.lock().await.insert(name.to_string()) {
            debug!("session {name} created");
            Ok(())
        } else {
            Err(SessionError::AlreadyExists(name.to_string()))
        }
    }

    /// Removes `name` if no client is in it any more.
    ///
    /// Returns `true` if the session was removed.
    pub async fn remove_if_empty(&self, name: &str, clients: &ClientRegistry) -> bool {
        // The client lock is released when `has_members` returns.
        if clients.has_members(name).await {
            return false;
        }
        let removed = self.sessions.lock().await.remove(name);
        if removed {
            debug!("session {name} removed (no members left)");
        }
        removed
    }

    /// Returns every active session name in sorted order.
    pub async fn names(&self) -> Vec<String> {
        self.sessions.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
