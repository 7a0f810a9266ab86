//! Integration tests for the chat-core codec working on a byte stream.
//!
//! These tests feed complete server transcripts through [`FrameBuffer`] the
//! way a socket read loop does, in chunks that ignore line boundaries.

use chat_core::{
    encode_frame,
    protocol::messages::{replies, MAX_PAYLOAD_LEN},
    Frame, FrameBuffer, MessageType, ProtocolError,
};

fn transcript() -> Vec<Frame> {
    vec![
        Frame::from_server(MessageType::LoginAck, replies::LOGIN_OK),
        Frame::from_server(MessageType::NewSessionAck, replies::SESSION_CREATED),
        Frame::new(MessageType::Message, "andy", "hello: world"),
        Frame::from_server(
            MessageType::QueryAck,
            "Clients: andy (session: team), ken (session: team); Sessions: team",
        ),
        Frame::from_server(MessageType::Exit, ""),
    ]
}

fn drain(buf: &mut FrameBuffer) -> Vec<Result<Frame, ProtocolError>> {
    let mut out = Vec::new();
    while let Some(result) = buf.next_frame() {
        out.push(result);
    }
    out
}

#[test]
fn test_transcript_survives_byte_at_a_time_delivery() {
    // Arrange
    let frames = transcript();
    let wire: Vec<u8> = frames
        .iter()
        .flat_map(|f| encode_frame(f).expect("encode"))
        .collect();
    let mut buf = FrameBuffer::new();
    let mut decoded = Vec::new();

    // Act
    for byte in &wire {
        buf.extend(std::slice::from_ref(byte));
        decoded.extend(drain(&mut buf));
    }

    // Assert
    let decoded: Vec<Frame> = decoded.into_iter().map(|r| r.expect("valid")).collect();
    assert_eq!(decoded, frames);
    assert_eq!(buf.pending(), 0);
}

#[test]
fn test_transcript_survives_single_large_read() {
    let frames = transcript();
    let wire: Vec<u8> = frames
        .iter()
        .flat_map(|f| encode_frame(f).expect("encode"))
        .collect();
    let mut buf = FrameBuffer::new();

    buf.extend(&wire);
    let decoded: Vec<Frame> = drain(&mut buf)
        .into_iter()
        .map(|r| r.expect("valid"))
        .collect();

    assert_eq!(decoded, frames);
}

#[test]
fn test_malformed_lines_between_valid_frames_are_isolated() {
    // Arrange: a garbage line, a size-mismatched line, and an over-long payload
    let mut buf = FrameBuffer::new();
    let oversized = format!("11:{0}:ken:{1}\n", MAX_PAYLOAD_LEN + 1, "x".repeat(MAX_PAYLOAD_LEN + 1));
    buf.extend(b"2:16:server:Login successful\n");
    buf.extend(b"hello there\n");
    buf.extend(b"11:1:ken:too long\n");
    buf.extend(oversized.as_bytes());
    buf.extend(b"6:14:server:Joined session\n");

    // Act
    let results = drain(&mut buf);

    // Assert
    assert_eq!(results.len(), 5);
    assert!(results[0].is_ok());
    assert_eq!(results[1], Err(ProtocolError::MissingFields(1)));
    assert!(matches!(results[2], Err(ProtocolError::SizeMismatch { .. })));
    assert!(matches!(
        results[3],
        Err(ProtocolError::FieldTooLong { field: "payload", .. })
    ));
    assert_eq!(
        results[4].as_ref().map(|f| f.message_type),
        Ok(MessageType::JoinAck)
    );
}
