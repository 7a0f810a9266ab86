//! # chat-core
//!
//! Shared library for Relay Chat containing the line-oriented wire codec,
//! the protocol message types, and the static credential table.
//!
//! This crate is used by both the server and client applications.
//! It has zero dependencies on OS APIs, async runtimes, or network sockets.
//!
//! # Architecture overview
//!
//! Relay Chat is a session-oriented text relay: clients log in, create or
//! join a named *session* (a chat room), and every message a member sends is
//! relayed to all other members of the same session.
//!
//! This crate (`chat-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How frames travel over the network.  Every frame is one
//!   text line `type:size:source:payload\n`; the codec turns typed [`Frame`]
//!   values into those lines and back, and [`FrameBuffer`] reassembles lines
//!   from arbitrary TCP read chunks.
//!
//! - **`domain`** – Pure rules with no I/O: the credential allow-list and the
//!   validation rules for identifiers and session names.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `chat_core::Frame` instead of `chat_core::protocol::messages::Frame`.
pub use domain::credentials::CredentialTable;
pub use protocol::codec::{decode_frame, encode_frame, FrameBuffer, ProtocolError};
pub use protocol::messages::{Frame, MessageType};
