//! ClientRegistry: the shared table of logged-in clients.
//!
//! Every successfully authenticated connection owns exactly one
//! [`ClientConnection`] entry, keyed by its identifier.  Each entry tracks:
//!
//! - The identifier the client logged in with (unique among live entries).
//! - The connection id of the task that owns the entry, so a stale task can
//!   never unregister somebody else.
//! - The outbound frame queue drained by that connection's writer task.  The
//!   queue holds at most [`OUTBOUND_CAPACITY`] frames; a client that stops
//!   reading loses frames instead of growing server memory.
//! - The session the client is currently in, if any.
//!
//! # Locking
//!
//! All state lives behind one `tokio::sync::Mutex`.  Every public method
//! takes the lock, does its work without awaiting anything else, and releases
//! it before returning, so callers can never hold this lock and the session
//! registry lock at the same time.

use std::collections::HashMap;

use chat_core::Frame;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// Frames that may wait for one connection's writer task.
pub const OUTBOUND_CAPACITY: usize = 128;

/// Sending half of a connection's outbound frame queue.
pub type Outbound = mpsc::Sender<Frame>;

/// Creates the bounded outbound queue for one connection.
pub fn outbound_queue() -> (Outbound, mpsc::Receiver<Frame>) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

/// Error type for client registry operations.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("client {0} is already logged in")]
    AlreadyLoggedIn(String),
    #[error("client {0} is not registered")]
    NotRegistered(String),
}

/// A logged-in client as seen by the rest of the server.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub identifier: String,
    pub connection_id: Uuid,
    pub session: Option<String>,
    outbound: Outbound,
}

impl ClientConnection {
    /// Creates an entry with no current session.
    pub fn new(identifier: impl Into<String>, connection_id: Uuid, outbound: Outbound) -> Self {
        Self {
            identifier: identifier.into(),
            connection_id,
            session: None,
            outbound,
        }
    }

    /// Queues `frame` for this client's writer task.
    ///
    /// Never blocks.  Returns `false` if the frame was dropped because the
    /// queue is full or the connection is already gone.
    pub fn send(&self, frame: Frame) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                warn!(
                    "outbound queue for {} is full; dropping {}",
                    self.identifier, frame.message_type
                );
                false
            }
            Err(TrySendError::Closed(frame)) => {
                debug!(
                    "outbound queue for {} is closed; dropping {}",
                    self.identifier, frame.message_type
                );
                false
            }
        }
    }

    pub fn is_in(&self, session: &str) -> bool {
        self.session.as_deref() == Some(session)
    }
}

/// Point-in-time view of one client, used for `QUERY` replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSummary {
    pub identifier: String,
    pub session: Option<String>,
}

/// In-memory registry of all logged-in clients.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, ClientConnection>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client.
    ///
    /// The uniqueness check and the insert happen under one lock acquisition,
    /// so two connections racing to log in with the same identifier cannot
    /// both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyLoggedIn`] if the identifier is taken.
    pub async fn add(&self, client: ClientConnection) -> Result<(), RegistryError> {
        let mut clients = self.clients.lock().await;
        if clients.contains_key(&client.identifier) {
            return Err(RegistryError::AlreadyLoggedIn(client.identifier));
        }
        clients.insert(client.identifier.clone(), client);
        Ok(())
    }

    /// Unregisters the client owned by `connection_id`.
    ///
    /// Returns the removed entry, or `None` if the identifier is not
    /// registered or belongs to a different connection.
    pub async fn remove(&self, identifier: &str, connection_id: Uuid) -> Option<ClientConnection> {
        let mut clients = self.clients.lock().await;
        match clients.get(identifier) {
            Some(entry) if entry.connection_id == connection_id => clients.remove(identifier),
            _ => None,
        }
    }

    /// Looks up a client by identifier.
    pub async fn find(&self, identifier: &str) -> Option<ClientConnection> {
        self.clients.lock().await.get(identifier).cloned()
    }

    /// Sets or clears the current session of a client.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotRegistered`] if no such client exists.
    pub async fn set_session(
        &self,
        identifier: &str,
        session: Option<String>,
    ) -> Result<(), RegistryError> {
        let mut clients = self.clients.lock().await;
        let client = clients
            .get_mut(identifier)
            .ok_or_else(|| RegistryError::NotRegistered(identifier.to_string()))?;
        client.session = session;
        Ok(())
    }

    /// Returns `true` if at least one client is currently in `session`.
    pub async fn has_members(&self, session: &str) -> bool {
        self.clients
            .lock()
            .await
            .values()
            .any(|client| client.is_in(session))
    }

    /// Returns every client with its session, sorted by identifier.
    pub async fn snapshot(&self) -> Vec<ClientSummary> {
        let mut summaries: Vec<ClientSummary> = self
            .clients
            .lock()
            .await
            .values()
            .map(|client| ClientSummary {
                identifier: client.identifier.clone(),
                session: client.session.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        summaries
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    /// Runs `f` over all entries while holding the registry lock.
    ///
    /// `f` must not block; it is used by the broadcast router to enqueue
    /// frames.
    pub(crate) async fn with_clients<R>(
        &self,
        f: impl FnOnce(&HashMap<String, ClientConnection>) -> R,
    ) -> R {
        let clients = self.clients.lock().await;
        f(&clients)
    }
}
