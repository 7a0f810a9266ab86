//! ClientController: the client-side protocol state machine.
//!
//! The controller owns all login and session state and performs no I/O.
//! Every input (a user command, an inbound frame, a lost connection) is
//! turned into a list of [`Effect`]s that the runtime carries out in order.
//!
//! # States
//!
//! ```text
//! LoggedOut ──/login──► LoggingIn ──LO_ACK──► LoggedIn(Idle)
//!     ▲                     │                    │   ▲
//!     └──── LO_NAK ─────────┘        /joinsession│   │JN_NAK, NS_ACK(other)
//!     │                                          ▼   │
//!     │                        PendingJoin / PendingCreate
//!     │                                          │
//!     │                      JN_ACK, NS_ACK("Session created")
//!     │                                          ▼
//!     └── /logout, disconnect ◄── InSession ──/leavesession──► LoggedIn(Idle)
//! ```

use chat_core::domain::names::is_valid_session_name;
use chat_core::protocol::messages::{is_session_created, MAX_NAME_LEN, MAX_PAYLOAD_LEN};
use chat_core::{Frame, MessageType};
use tracing::debug;

use crate::application::command::Command;

/// Side effect requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a connection to `addr` and send `login` as the first frame.
    Connect { addr: String, login: Frame },
    Send(Frame),
    /// Close the current connection, if any.
    Disconnect,
    /// Show one line to the user.
    Print(String),
    /// Stop the client.
    Quit,
}

/// Where the client stands with respect to sessions while logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    PendingJoin(String),
    PendingCreate(String),
    InSession(String),
}

/// Connection-level state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    LoggedOut,
    LoggingIn { identifier: String },
    LoggedIn { identifier: String, session: SessionState },
}

/// Pure client state machine.
#[derive(Debug)]
pub struct ClientController {
    state: ClientState,
}

impl Default for ClientController {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientController {
    pub fn new() -> Self {
        Self {
            state: ClientState::LoggedOut,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// The session the client is confirmed to be in.
    pub fn current_session(&self) -> Option<&str> {
        match &self.state {
            ClientState::LoggedIn {
                session: SessionState::InSession(name),
                ..
            } => Some(name),
            _ => None,
        }
    }

    /// `true` while a connection exists (logging in or logged in).
    pub fn is_connected(&self) -> bool {
        !matches!(self.state, ClientState::LoggedOut)
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    pub fn handle_command(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Login {
                identifier,
                password,
                host,
                port,
            } => self.login(identifier, password, &host, port),
            Command::Logout => {
                if self.is_connected() {
                    self.logout()
                } else {
                    vec![warning("Not logged in.")]
                }
            }
            Command::JoinSession(name) => self.request_session(name, false),
            Command::CreateSession(name) => self.request_session(name, true),
            Command::LeaveSession => self.leave(),
            Command::List => match self.identifier() {
                Some(id) => vec![Effect::Send(Frame::new(MessageType::Query, id, ""))],
                None => vec![warning(MUST_LOGIN)],
            },
            Command::Quit => {
                let mut effects = if self.is_connected() {
                    self.logout()
                } else {
                    Vec::new()
                };
                effects.push(Effect::Quit);
                effects
            }
            Command::Text(text) => self.say(text),
        }
    }

    fn login(&mut self, identifier: String, password: String, host: &str, port: u16) -> Vec<Effect> {
        if self.is_connected() {
            return vec![warning("Already logged in. Use /logout first.")];
        }
        if password.len() > MAX_PAYLOAD_LEN {
            return vec![warning("Password is too long.")];
        }
        let login = Frame::new(MessageType::Login, identifier.as_str(), password);
        self.state = ClientState::LoggingIn { identifier };
        vec![Effect::Connect {
            addr: format!("{host}:{port}"),
            login,
        }]
    }

    fn logout(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(id) = self.identifier() {
            effects.push(Effect::Send(Frame::new(MessageType::Exit, id, "")));
        }
        effects.push(Effect::Disconnect);
        self.state = ClientState::LoggedOut;
        effects
    }

    fn request_session(&mut self, name: String, create: bool) -> Vec<Effect> {
        let ClientState::LoggedIn {
            identifier,
            session,
        } = &mut self.state
        else {
            return vec![warning(MUST_LOGIN)];
        };

        match session {
            SessionState::Idle => {}
            SessionState::InSession(_) if create => {
                return vec![warning("Leave current session to create a new one.")]
            }
            SessionState::InSession(_) => {
                return vec![warning(
                    "Already in a session. Leave current session before joining another.",
                )]
            }
            SessionState::PendingJoin(pending) | SessionState::PendingCreate(pending) => {
                return vec![warning(format!(
                    "Still waiting for the server to answer about session {pending}."
                ))]
            }
        }
        if !is_valid_session_name(&name) {
            return vec![warning(format!(
                "Invalid session ID (1 to {MAX_NAME_LEN} bytes, no spaces or control characters)."
            ))];
        }

        let (message_type, pending) = if create {
            (MessageType::NewSession, SessionState::PendingCreate(name.clone()))
        } else {
            (MessageType::Join, SessionState::PendingJoin(name.clone()))
        };
        let frame = Frame::new(message_type, identifier.as_str(), name);
        *session = pending;
        vec![Effect::Send(frame)]
    }

    fn leave(&mut self) -> Vec<Effect> {
        let ClientState::LoggedIn {
            identifier,
            session,
        } = &mut self.state
        else {
            return vec![warning(MUST_LOGIN)];
        };
        if !matches!(session, SessionState::InSession(_)) {
            return vec![warning(NOT_IN_SESSION)];
        }
        *session = SessionState::Idle;
        vec![Effect::Send(Frame::new(
            MessageType::LeaveSession,
            identifier.as_str(),
            "",
        ))]
    }

    fn say(&self, text: String) -> Vec<Effect> {
        let Some(id) = self.identifier() else {
            return vec![warning(MUST_LOGIN)];
        };
        if self.current_session().is_none() {
            return vec![warning(NOT_IN_SESSION)];
        }
        if text.len() > MAX_PAYLOAD_LEN {
            return vec![warning(format!(
                "Message is too long (at most {MAX_PAYLOAD_LEN} bytes)."
            ))];
        }
        if text.contains(['\r', '\n']) {
            return vec![warning("Messages cannot contain line breaks.")];
        }
        vec![Effect::Send(Frame::new(MessageType::Message, id, text))]
    }

    // ── Network input ─────────────────────────────────────────────────────────

    pub fn handle_frame(&mut self, frame: Frame) -> Vec<Effect> {
        match (&mut self.state, frame.message_type) {
            (ClientState::LoggingIn { identifier }, MessageType::LoginAck) => {
                self.state = ClientState::LoggedIn {
                    identifier: std::mem::take(identifier),
                    session: SessionState::Idle,
                };
                vec![Effect::Print(frame.payload)]
            }
            (ClientState::LoggingIn { .. }, MessageType::LoginNak) => {
                self.state = ClientState::LoggedOut;
                vec![warning(frame.payload), Effect::Disconnect]
            }
            (ClientState::LoggedIn { session, .. }, MessageType::JoinAck) => {
                match std::mem::replace(session, SessionState::Idle) {
                    SessionState::PendingJoin(name) => {
                        *session = SessionState::InSession(name.clone());
                        vec![Effect::Print(format!("Current session: {name}"))]
                    }
                    other => unexpected(session, other, &frame),
                }
            }
            (ClientState::LoggedIn { session, .. }, MessageType::JoinNak) => {
                match std::mem::replace(session, SessionState::Idle) {
                    SessionState::PendingJoin(_) => vec![warning(frame.payload)],
                    other => unexpected(session, other, &frame),
                }
            }
            (ClientState::LoggedIn { session, .. }, MessageType::NewSessionAck) => {
                match std::mem::replace(session, SessionState::Idle) {
                    SessionState::PendingCreate(name) if is_session_created(&frame.payload) => {
                        *session = SessionState::InSession(name.clone());
                        vec![Effect::Print(format!("Current session: {name}"))]
                    }
                    SessionState::PendingCreate(_) => vec![warning(frame.payload)],
                    other => unexpected(session, other, &frame),
                }
            }
            (ClientState::LoggedIn { .. }, MessageType::QueryAck) => {
                vec![Effect::Print(frame.payload)]
            }
            (
                ClientState::LoggedIn {
                    session: SessionState::InSession(_),
                    ..
                },
                MessageType::Message,
            ) => vec![Effect::Print(format!("[{}]: {}", frame.source, frame.payload))],
            (_, message_type) => {
                debug!("ignoring {message_type} in state {:?}", self.state);
                Vec::new()
            }
        }
    }

    /// The connection went away without a `/logout`.
    pub fn handle_disconnect(&mut self) -> Vec<Effect> {
        if !self.is_connected() {
            return Vec::new();
        }
        self.state = ClientState::LoggedOut;
        vec![Effect::Print("Disconnected from server.".to_string())]
    }

    /// The connection requested by [`Effect::Connect`] could not be opened.
    pub fn handle_connect_failed(&mut self, reason: &str) -> Vec<Effect> {
        self.state = ClientState::LoggedOut;
        vec![warning(format!("Connection failed: {reason}"))]
    }

    fn identifier(&self) -> Option<&str> {
        match &self.state {
            ClientState::LoggedIn { identifier, .. } => Some(identifier),
            _ => None,
        }
    }
}

const MUST_LOGIN: &str = "You must login first.";
const NOT_IN_SESSION: &str = "Not in a session yet.";

/// Formats a warning line.
pub fn warning(text: impl std::fmt::Display) -> Effect {
    Effect::Print(format!("[warning]: {text}"))
}

/// Puts back a session state that an unexpected reply must not change.
fn unexpected(slot: &mut SessionState, previous: SessionState, frame: &Frame) -> Vec<Effect> {
    debug!(
        "ignoring {} while session state is {previous:?}",
        frame.message_type
    );
    *slot = previous;
    Vec::new()
}
