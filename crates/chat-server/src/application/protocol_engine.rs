//! ProtocolEngine: the per-connection server state machine.
//!
//! One engine instance exists for every accepted connection.  The connection
//! task feeds it decoded frames one at a time; the engine validates each
//! frame against the registries, mutates them, and queues replies on its own
//! outbound queue.
//!
//! # Transition table
//!
//! | Frame        | Accepted when                              | Reply                    |
//! |--------------|--------------------------------------------|--------------------------|
//! | `LOGIN`      | credentials match, identifier not in use   | `LO_ACK` / `LO_NAK`      |
//! | `EXIT`       | always                                     | `EXIT` echo, then close  |
//! | `JOIN`       | session exists, client not in a session    | `JN_ACK` / `JN_NAK`      |
//! | `NEW_SESS`   | client not in a session, name not active   | `NS_ACK` (text decides)  |
//! | `LEAVE_SESS` | logged in                                  | `LEAVE_SESS`             |
//! | `MESSAGE`    | client in a session                        | none; relayed to peers   |
//! | `QUERY`      | logged in                                  | `QU_ACK`                 |
//!
//! Before `LOGIN` succeeds, `JOIN` and `NEW_SESS` are refused with
//! "Not logged in" and every other frame except `EXIT` is ignored.

use std::sync::Arc;

use chat_core::domain::names::{is_valid_identifier, is_valid_session_name};
use chat_core::protocol::messages::{replies, MAX_PAYLOAD_LEN};
use chat_core::{CredentialTable, Frame, MessageType};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::broadcast;
use crate::application::client_registry::{
    ClientConnection, ClientRegistry, ClientSummary, Outbound,
};
use crate::application::session_registry::SessionRegistry;

/// Registries and credentials shared by every connection.
pub struct ServerState {
    pub clients: ClientRegistry,
    pub sessions: SessionRegistry,
    pub credentials: CredentialTable,
}

impl ServerState {
    pub fn new(credentials: CredentialTable) -> Arc<Self> {
        Arc::new(Self {
            clients: ClientRegistry::new(),
            sessions: SessionRegistry::new(),
            credentials,
        })
    }
}

/// What the connection loop should do after a frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Per-connection protocol handler.
pub struct ProtocolEngine {
    state: Arc<ServerState>,
    connection_id: Uuid,
    outbound: Outbound,
    identifier: Option<String>,
    session: Option<String>,
}

impl ProtocolEngine {
    /// Creates an engine for a fresh, not yet authenticated connection.
    ///
    /// `outbound` is the queue drained by this connection's writer task.
    pub fn new(state: Arc<ServerState>, outbound: Outbound) -> Self {
        Self {
            state,
            connection_id: Uuid::new_v4(),
            outbound,
            identifier: None,
            session: None,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Identifier this connection logged in as, if any.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Session this connection is currently in, if any.
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Handles one decoded frame.
    pub async fn handle_frame(&mut self, frame: Frame) -> Flow {
        debug!(
            "connection {} received {} from {:?}",
            self.connection_id, frame.message_type, frame.source
        );

        match frame.message_type {
            MessageType::Login => self.handle_login(frame).await,
            MessageType::Exit => return self.handle_exit().await,
            MessageType::Join => self.handle_join(&frame.payload).await,
            MessageType::NewSession => self.handle_new_session(&frame.payload).await,
            MessageType::LeaveSession => self.handle_leave().await,
            MessageType::Message => self.handle_message(frame).await,
            MessageType::Query => self.handle_query().await,
            MessageType::LoginAck
            | MessageType::LoginNak
            | MessageType::JoinAck
            | MessageType::JoinNak
            | MessageType::NewSessionAck
            | MessageType::QueryAck => {
                warn!(
                    "connection {} sent server-only frame {}; ignoring",
                    self.connection_id, frame.message_type
                );
            }
        }
        Flow::Continue
    }

    /// Releases everything this connection holds in the registries.
    ///
    /// Called once the read loop ends for any reason (EOF, error, `EXIT`).
    /// Safe to call more than once.
    pub async fn teardown(&mut self) {
        let Some(identifier) = self.identifier.take() else {
            return;
        };
        let left = self.session.take();

        self.state
            .clients
            .remove(&identifier, self.connection_id)
            .await;
        if let Some(session) = left {
            self.state
                .sessions
                .remove_if_empty(&session, &self.state.clients)
                .await;
        }
        info!("client {identifier} logged out");
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    async fn handle_login(&mut self, frame: Frame) {
        if self.identifier.is_some() {
            self.reply(MessageType::LoginNak, replies::ALREADY_LOGGED_IN);
            return;
        }

        let identifier = frame.source;
        if !is_valid_identifier(&identifier)
            || !self.state.credentials.verify(&identifier, &frame.payload)
        {
            warn!("rejected login for {identifier:?}: bad credentials");
            self.reply(MessageType::LoginNak, replies::LOGIN_REJECTED);
            return;
        }

        let client = ClientConnection::new(
            identifier.clone(),
            self.connection_id,
            self.outbound.clone(),
        );
        match self.state.clients.add(client).await {
            Ok(()) => {
                info!("client {identifier} logged in");
                self.identifier = Some(identifier);
                self.reply(MessageType::LoginAck, replies::LOGIN_OK);
            }
            Err(e) => {
                warn!("rejected login: {e}");
                self.reply(MessageType::LoginNak, replies::LOGIN_REJECTED);
            }
        }
    }

    async fn handle_exit(&mut self) -> Flow {
        self.teardown().await;
        self.reply(MessageType::Exit, "");
        Flow::Close
    }

    async fn handle_join(&mut self, name: &str) {
        let Some(identifier) = self.identifier.clone() else {
            self.reply(MessageType::JoinNak, replies::NOT_LOGGED_IN);
            return;
        };
        if !self.state.sessions.exists(name).await {
            self.reply(MessageType::JoinNak, replies::SESSION_MISSING);
            return;
        }
        if self.session.is_some() {
            self.reply(MessageType::JoinNak, replies::ALREADY_IN_SESSION);
            return;
        }

        if self.enter_session(&identifier, name).await {
            info!("client {identifier} joined session {name}");
            self.reply(MessageType::JoinAck, replies::JOINED);
        }
    }

    async fn handle_new_session(&mut self, name: &str) {
        let Some(identifier) = self.identifier.clone() else {
            self.reply(MessageType::NewSessionAck, replies::NOT_LOGGED_IN);
            return;
        };
        if self.session.is_some() {
            self.reply(MessageType::NewSessionAck, replies::ALREADY_IN_SESSION);
            return;
        }
        if !is_valid_session_name(name) {
            self.reply(MessageType::NewSessionAck, replies::INVALID_SESSION_NAME);
            return;
        }
        if self.state.sessions.create(name).await.is_err() {
            self.reply(MessageType::NewSessionAck, replies::SESSION_EXISTS);
            return;
        }

        if self.enter_session(&identifier, name).await {
            info!("client {identifier} created session {name}");
            self.reply(MessageType::NewSessionAck, replies::SESSION_CREATED);
        } else {
            self.state
                .sessions
                .remove_if_empty(name, &self.state.clients)
                .await;
        }
    }

    async fn handle_leave(&mut self) {
        let Some(identifier) = self.identifier.clone() else {
            debug!(
                "ignoring LEAVE_SESS from unauthenticated connection {}",
                self.connection_id
            );
            return;
        };
        let Some(session) = self.session.take() else {
            self.reply(MessageType::LeaveSession, replies::NOT_IN_SESSION);
            return;
        };

        if let Err(e) = self.state.clients.set_session(&identifier, None).await {
            warn!("leave for {identifier}: {e}");
        }
        self.state
            .sessions
            .remove_if_empty(&session, &self.state.clients)
            .await;
        info!("client {identifier} left session {session}");
        self.reply(MessageType::LeaveSession, replies::LEFT);
    }

    async fn handle_message(&self, frame: Frame) {
        let (Some(identifier), Some(session)) = (self.identifier(), self.session()) else {
            debug!(
                "dropping message from connection {} outside a session",
                self.connection_id
            );
            return;
        };

        // Relay under the server-known identifier, never the claimed source.
        let relayed = Frame::new(MessageType::Message, identifier, frame.payload);
        let delivered =
            broadcast::deliver(&self.state.clients, session, &relayed, identifier).await;
        debug!("message from {identifier} delivered to {delivered} peer(s) in {session}");
    }

    async fn handle_query(&self) {
        if self.identifier.is_none() {
            debug!(
                "ignoring QUERY from unauthenticated connection {}",
                self.connection_id
            );
            return;
        }
        let clients = self.state.clients.snapshot().await;
        let sessions = self.state.sessions.names().await;
        self.reply(MessageType::QueryAck, format_query_reply(&clients, &sessions));
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Records `name` as the current session locally and in the registry.
    async fn enter_session(&mut self, identifier: &str, name: &str) -> bool {
        match self
            .state
            .clients
            .set_session(identifier, Some(name.to_string()))
            .await
        {
            Ok(()) => {
                self.session = Some(name.to_string());
                true
            }
            Err(e) => {
                warn!("could not record session for {identifier}: {e}");
                false
            }
        }
    }

    fn reply(&self, message_type: MessageType, payload: impl Into<String>) {
        match self
            .outbound
            .try_send(Frame::from_server(message_type, payload))
        {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!(
                "connection {} outbound queue is full; dropping {message_type} reply",
                self.connection_id
            ),
            Err(TrySendError::Closed(_)) => debug!(
                "connection {} writer is gone; dropping {message_type} reply",
                self.connection_id
            ),
        }
    }
}

/// Formats the `QU_ACK` payload.
///
/// ```text
/// Clients: andy (session: team), ken (session: None); Sessions: team
/// ```
///
/// The text is cut at a character boundary so it always fits in one frame.
pub fn format_query_reply(clients: &[ClientSummary], sessions: &[String]) -> String {
    let client_list = if clients.is_empty() {
        "None".to_string()
    } else {
        clients
            .iter()
            .map(|c| {
                format!(
                    "{} (session: {})",
                    c.identifier,
                    c.session.as_deref().unwrap_or("None")
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let session_list = if sessions.is_empty() {
        "None".to_string()
    } else {
        sessions.join(", ")
    };

    let mut text = format!("Clients: {client_list}; Sessions: {session_list}");
    truncate_at_boundary(&mut text, MAX_PAYLOAD_LEN);
    text
}

fn truncate_at_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
