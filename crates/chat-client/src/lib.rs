//! chat-client library entry point.
//!
//! The binary in `main.rs` only wires standard input and output to the
//! [`ClientRuntime`](infrastructure::network::runtime::ClientRuntime); all
//! behaviour lives here so it can be tested without a terminal.

pub mod application;
pub mod infrastructure;
