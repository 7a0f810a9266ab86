//! Infrastructure layer of the chat server.
//!
//! Contains the OS-facing adapters: the TCP listener, per-connection socket
//! tasks, and the TOML configuration loader.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `chat_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
