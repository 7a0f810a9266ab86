//! Network infrastructure for the chat server.
//!
//! # Sub-modules
//!
//! - **`listener`** – Binds the TCP listening socket and runs the accept loop
//!   until shutdown is requested.
//!
//! - **`connection`** – Drives one accepted socket: reassembles frames,
//!   feeds them to a [`ProtocolEngine`](crate::application::ProtocolEngine),
//!   and writes queued replies back out.

pub mod connection;
pub mod listener;
