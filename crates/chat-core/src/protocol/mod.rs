//! Protocol module containing frame types and the line codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_frame, encode_frame, FrameBuffer, ProtocolError};
pub use messages::*;
