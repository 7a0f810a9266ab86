//! Line codec for encoding and decoding Relay Chat frames.
//!
//! Wire format:
//! ```text
//! type:size:source:payload\n
//! ```
//! `type` and `size` are decimal integers; `size` must equal the byte length
//! of `payload`.  Decoding splits on the first three separators only, so the
//! payload may itself contain `:`.  A complete line (terminator included) is
//! at most [`MAX_FRAME_LEN`] bytes.
//!
//! # Known weakness
//!
//! The format cannot carry a newline inside the payload, and a sender that
//! puts a `:` in the source field silently shifts every following field.  The
//! encoder refuses both; the decoder catches the shift through the `size`
//! check.

use thiserror::Error;
use tracing::warn;

use crate::protocol::messages::{
    Frame, MessageType, FIELD_SEPARATOR, MAX_FRAME_LEN, MAX_NAME_LEN, MAX_PAYLOAD_LEN,
};

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The line does not contain the `type`, `size` and `source` fields.
    #[error("malformed frame: expected at least 3 fields, got {0}")]
    MissingFields(usize),

    /// The `type` field is a number but not a defined message type.
    #[error("unknown message type: {0}")]
    UnknownMessageType(u32),

    /// A numeric field could not be parsed.
    #[error("invalid {field} field: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// The `size` field disagrees with the payload actually received.
    #[error("payload size mismatch: header says {declared}, payload is {actual} bytes")]
    SizeMismatch { declared: usize, actual: usize },

    /// The source or payload exceeds its bound.
    #[error("{field} too long: {len} bytes exceeds limit of {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// The whole line exceeds [`MAX_FRAME_LEN`].
    #[error("frame exceeds {max} bytes")]
    FrameTooLong { max: usize },

    /// A field contains a character the line format cannot carry.
    #[error("{field} contains forbidden character {ch:?}")]
    ForbiddenCharacter { field: &'static str, ch: char },

    /// The line is not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Frame`] into one terminated wire line.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the source contains a separator or line
/// break, the payload contains a line break, or either field is too long.
///
/// # Examples
///
/// ```rust
/// use chat_core::{encode_frame, Frame, MessageType};
///
/// let frame = Frame::new(MessageType::Message, "ken", "hi: there");
/// let bytes = encode_frame(&frame).unwrap();
/// assert_eq!(bytes, b"11:9:ken:hi: there\n");
/// ```
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, ProtocolError> {
    check_source(&frame.source)?;
    check_payload(&frame.payload)?;

    let line = format!(
        "{}{sep}{}{sep}{}{sep}{}\n",
        frame.message_type.code(),
        frame.size(),
        frame.source,
        frame.payload,
        sep = FIELD_SEPARATOR,
    );
    if line.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLong { max: MAX_FRAME_LEN });
    }
    Ok(line.into_bytes())
}

/// Decodes one frame from a single line.
///
/// A trailing `\n` or `\r\n` is stripped if present.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the line is malformed.
///
/// # Examples
///
/// ```rust
/// use chat_core::{decode_frame, MessageType};
///
/// let frame = decode_frame("5:4:andy:team").unwrap();
/// assert_eq!(frame.message_type, MessageType::Join);
/// assert_eq!(frame.source, "andy");
/// assert_eq!(frame.payload, "team");
/// ```
pub fn decode_frame(line: &str) -> Result<Frame, ProtocolError> {
    let line = strip_terminator(line);
    if line.len() + 1 > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLong { max: MAX_FRAME_LEN });
    }

    let fields: Vec<&str> = line.splitn(4, FIELD_SEPARATOR).collect();
    if fields.len() < 3 {
        return Err(ProtocolError::MissingFields(fields.len()));
    }

    let code = parse_number::<u32>(fields[0], "type")?;
    let message_type =
        MessageType::try_from(code).map_err(|_| ProtocolError::UnknownMessageType(code))?;
    let declared = parse_number::<usize>(fields[1], "size")?;
    let source = fields[2];
    let payload = fields.get(3).copied().unwrap_or_default();

    if source.len() > MAX_NAME_LEN {
        return Err(ProtocolError::FieldTooLong {
            field: "source",
            len: source.len(),
            max: MAX_NAME_LEN,
        });
    }
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::FieldTooLong {
            field: "payload",
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    if declared != payload.len() {
        return Err(ProtocolError::SizeMismatch {
            declared,
            actual: payload.len(),
        });
    }

    Ok(Frame::new(message_type, source, payload))
}

// ── Streaming reassembly ──────────────────────────────────────────────────────

/// Reassembles frame lines from a TCP byte stream.
///
/// A single socket read may return part of a line or several lines at once.
/// Bytes are accumulated with [`FrameBuffer::extend`] and complete frames are
/// pulled out with [`FrameBuffer::next_frame`] until it returns `None`.
///
/// A line that grows past [`MAX_FRAME_LEN`] is reported once as
/// [`ProtocolError::FrameTooLong`] and the rest of it is skipped up to the
/// next line separator, so the stream resynchronises on the following frame.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    discarding: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes that do not yet form a complete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next complete frame, or `None` if more bytes are needed.
    ///
    /// Each `Some(Err(_))` stands for exactly one bad line; callers log it
    /// and keep calling.
    pub fn next_frame(&mut self) -> Option<Result<Frame, ProtocolError>> {
        loop {
            let newline = self.buf.iter().position(|&b| b == b'\n');

            if self.discarding {
                match newline {
                    Some(pos) => {
                        self.buf.drain(..=pos);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buf.clear();
                        return None;
                    }
                }
            }

            return match newline {
                Some(pos) => {
                    let line: Vec<u8> = self.buf.drain(..=pos).collect();
                    if line.len() > MAX_FRAME_LEN {
                        return Some(Err(ProtocolError::FrameTooLong { max: MAX_FRAME_LEN }));
                    }
                    Some(
                        std::str::from_utf8(&line)
                            .map_err(|_| ProtocolError::InvalidUtf8)
                            .and_then(decode_frame),
                    )
                }
                None if self.buf.len() >= MAX_FRAME_LEN => {
                    warn!(
                        "discarding over-long frame ({} bytes without terminator)",
                        self.buf.len()
                    );
                    self.buf.clear();
                    self.discarding = true;
                    Some(Err(ProtocolError::FrameTooLong { max: MAX_FRAME_LEN }))
                }
                None => None,
            };
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &'static str) -> Result<T, ProtocolError> {
    value.parse::<T>().map_err(|_| ProtocolError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn check_source(source: &str) -> Result<(), ProtocolError> {
    if source.len() > MAX_NAME_LEN {
        return Err(ProtocolError::FieldTooLong {
            field: "source",
            len: source.len(),
            max: MAX_NAME_LEN,
        });
    }
    if let Some(ch) = source
        .chars()
        .find(|&c| c == FIELD_SEPARATOR || c == '\n' || c == '\r')
    {
        return Err(ProtocolError::ForbiddenCharacter {
            field: "source",
            ch,
        });
    }
    Ok(())
}

fn check_payload(payload: &str) -> Result<(), ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::FieldTooLong {
            field: "payload",
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    if let Some(ch) = payload.chars().find(|&c| c == '\n' || c == '\r') {
        return Err(ProtocolError::ForbiddenCharacter {
            field: "payload",
            ch,
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
