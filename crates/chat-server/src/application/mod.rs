//! Application layer of the chat server.
//!
//! Everything here works on decoded [`chat_core::Frame`] values and shared
//! in-memory state; sockets never appear in this layer.
//!
//! # Sub-modules
//!
//! - **`client_registry`** – Table of logged-in clients, their outbound
//!   queues, and their current session.
//!
//! - **`session_registry`** – Set of active session names and the
//!   remove-when-empty rule.
//!
//! - **`broadcast`** – Fans a chat message out to every other member of the
//!   sender's session.
//!
//! - **`protocol_engine`** – Per-connection state machine that turns inbound
//!   frames into registry changes and replies.  Also owns [`ServerState`],
//!   the bundle of registries shared by all connections.

pub mod broadcast;
pub mod client_registry;
pub mod protocol_engine;
pub mod session_registry;

pub use protocol_engine::{Flow, ProtocolEngine, ServerState};
