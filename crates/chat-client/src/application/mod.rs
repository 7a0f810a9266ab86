//! Application layer of the chat client.
//!
//! # Sub-modules
//!
//! - **`command`** – Turns a line of terminal input into a [`command::Command`].
//!
//! - **`controller`** – Pure state machine for login and session state.  It
//!   performs no I/O; it answers every command or frame with a list of
//!   effects for the runtime to carry out.

pub mod command;
pub mod controller;
