//! Infrastructure layer of the chat client: sockets and the terminal.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `chat_core`, but MUST NOT be imported by the `application` layer.

pub mod input;
pub mod network;
