//! Domain rules for Relay Chat.
//!
//! Pure business logic with no infrastructure dependencies: which users may
//! log in, and what counts as an acceptable identifier or session name.

/// Static allow-list of identifiers and passwords.
pub mod credentials;

/// Validation of identifiers and session names.
pub mod names;
