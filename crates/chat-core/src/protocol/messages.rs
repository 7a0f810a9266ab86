//! All Relay Chat protocol message types.
//!
//! Every frame on the wire is a single text line:
//!
//! ```text
//! type:size:source:payload\n
//! ```
//!
//! `type` is one of the numeric [`MessageType`] codes, `size` is the byte
//! length of `payload`, and `source` is the sender identifier (`"server"` for
//! replies generated by the server).

use std::fmt;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Maximum length in bytes of an identifier or a session name.
pub const MAX_NAME_LEN: usize = 50;

/// Maximum length in bytes of a frame payload.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// Maximum length in bytes of one complete frame line, terminator included.
pub const MAX_FRAME_LEN: usize = 2048;

/// Separator between the four frame fields.
pub const FIELD_SEPARATOR: char = ':';

/// Source identifier used on every frame the server generates itself.
pub const SERVER_SOURCE: &str = "server";

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    Login = 1,
    LoginAck = 2,
    LoginNak = 3,
    Exit = 4,
    Join = 5,
    JoinAck = 6,
    JoinNak = 7,
    LeaveSession = 8,
    NewSession = 9,
    NewSessionAck = 10,
    Message = 11,
    Query = 12,
    QueryAck = 13,
}

impl MessageType {
    /// Returns the numeric code written in the `type` field.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Returns the protocol name of this type (e.g. `"LO_ACK"`).
    pub fn name(self) -> &'static str {
        match self {
            MessageType::Login => "LOGIN",
            MessageType::LoginAck => "LO_ACK",
            MessageType::LoginNak => "LO_NAK",
            MessageType::Exit => "EXIT",
            MessageType::Join => "JOIN",
            MessageType::JoinAck => "JN_ACK",
            MessageType::JoinNak => "JN_NAK",
            MessageType::LeaveSession => "LEAVE_SESS",
            MessageType::NewSession => "NEW_SESS",
            MessageType::NewSessionAck => "NS_ACK",
            MessageType::Message => "MESSAGE",
            MessageType::Query => "QUERY",
            MessageType::QueryAck => "QU_ACK",
        }
    }
}

impl TryFrom<u32> for MessageType {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            1 => Ok(MessageType::Login),
            2 => Ok(MessageType::LoginAck),
            3 => Ok(MessageType::LoginNak),
            4 => Ok(MessageType::Exit),
            5 => Ok(MessageType::Join),
            6 => Ok(MessageType::JoinAck),
            7 => Ok(MessageType::JoinNak),
            8 => Ok(MessageType::LeaveSession),
            9 => Ok(MessageType::NewSession),
            10 => Ok(MessageType::NewSessionAck),
            11 => Ok(MessageType::Message),
            12 => Ok(MessageType::Query),
            13 => Ok(MessageType::QueryAck),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Reply texts ───────────────────────────────────────────────────────────────

/// Human-readable payloads carried by server replies.
///
/// `NS_ACK` is used for both success and rejection; the two are told apart
/// only by the payload, so clients must compare against
/// [`replies::SESSION_CREATED`] via [`is_session_created`].
pub mod replies {
    pub const LOGIN_OK: &str = "Login successful";
    pub const LOGIN_REJECTED: &str = "Invalid credentials or already logged in";
    pub const ALREADY_LOGGED_IN: &str = "Already logged in";
    pub const NOT_LOGGED_IN: &str = "Not logged in";
    pub const JOINED: &str = "Joined session";
    pub const SESSION_MISSING: &str = "Session does not exist";
    pub const ALREADY_IN_SESSION: &str = "Already in a session";
    pub const SESSION_CREATED: &str = "Session created";
    pub const SESSION_EXISTS: &str = "Session already exists";
    pub const INVALID_SESSION_NAME: &str = "Invalid session name";
    pub const LEFT: &str = "Left session";
    pub const NOT_IN_SESSION: &str = "Not in a session";
}

/// Returns `true` if an `NS_ACK` payload reports a successful creation.
pub fn is_session_created(payload: &str) -> bool {
    payload == replies::SESSION_CREATED
}

// ── Frame ─────────────────────────────────────────────────────────────────────

/// One complete protocol message.
///
/// The `size` field of the wire format is not stored: it is always derived
/// from the payload when encoding and checked against it when decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    pub source: String,
    pub payload: String,
}

impl Frame {
    pub fn new(
        message_type: MessageType,
        source: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            message_type,
            source: source.into(),
            payload: payload.into(),
        }
    }

    /// Builds a reply frame whose source is [`SERVER_SOURCE`].
    pub fn from_server(message_type: MessageType, payload: impl Into<String>) -> Self {
        Self::new(message_type, SERVER_SOURCE, payload)
    }

    /// Byte length of the payload, as written in the `size` field.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
