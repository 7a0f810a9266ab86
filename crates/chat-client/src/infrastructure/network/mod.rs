//! Network infrastructure for the chat client.
//!
//! # Sub-modules
//!
//! - **`connector`** – The [`connector::Connector`] trait and its TCP
//!   implementation.
//!
//! - **`runtime`** – The task that owns the client state, applies controller
//!   effects, and runs the receive loop of the current connection.

pub mod connector;
pub mod runtime;
