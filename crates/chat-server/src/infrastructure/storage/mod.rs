//! Storage infrastructure: configuration file loading.
//!
//! The server keeps no persistent state.  The only thing read from disk is
//! the optional TOML configuration file handled by [`config`].

pub mod config;
