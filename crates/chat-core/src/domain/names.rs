//! Validation rules for identifiers and session names.

use crate::protocol::messages::{FIELD_SEPARATOR, MAX_NAME_LEN};

/// Returns `true` if `name` can be used as a session name.
///
/// Session names travel in the payload, so a `:` is allowed; they must be
/// non-empty, at most [`MAX_NAME_LEN`] bytes, and free of whitespace and
/// control characters.
pub fn is_valid_session_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Returns `true` if `identifier` can be used as a frame source.
pub fn is_valid_identifier(identifier: &str) -> bool {
    is_valid_session_name(identifier) && !identifier.contains(FIELD_SEPARATOR)
}
