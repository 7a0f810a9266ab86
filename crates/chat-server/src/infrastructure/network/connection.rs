//! Per-connection socket handling.
//!
//! Each accepted socket is split into two halves driven by two tasks:
//!
//! ```text
//!   socket read half ──► FrameBuffer ──► ProtocolEngine ──► registries
//!                                              │
//!                                   outbound queue (mpsc)
//!                                              │
//!   socket write half ◄── writer task ◄────────┘ ◄── broadcasts from peers
//! ```
//!
//! The reader owns the [`ProtocolEngine`].  Replies and relayed messages only
//! ever reach the socket through the outbound queue, so the writer task is
//! the single writer for the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use chat_core::{encode_frame, Frame, FrameBuffer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::client_registry::outbound_queue;
use crate::application::{Flow, ProtocolEngine, ServerState};

const READ_CHUNK: usize = 4096;

/// Serves one client connection until EOF, a socket error, or `EXIT`.
///
/// Whatever ends the connection, the client is unregistered and its session
/// is removed if it was the last member.
pub async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<ServerState>) {
    let (reader, writer) = stream.into_split();
    let (tx, rx) = outbound_queue();
    let writer_task = tokio::spawn(write_loop(writer, rx, peer_addr));

    let mut engine = ProtocolEngine::new(state, tx);
    debug!(
        "connection {} serving {peer_addr}",
        engine.connection_id()
    );

    match read_loop(reader, &mut engine, peer_addr).await {
        Ok(()) => info!("connection {peer_addr} closed"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e}"),
    }
    engine.teardown().await;

    // Dropping the engine drops the last sender; the writer flushes what is
    // queued (e.g. the EXIT echo) and then closes the socket.
    drop(engine);
    if let Err(e) = writer_task.await {
        warn!("writer task for {peer_addr} panicked: {e}");
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    engine: &mut ProtocolEngine,
    peer_addr: SocketAddr,
) -> std::io::Result<()> {
    let mut frames = FrameBuffer::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        frames.extend(&chunk[..n]);

        while let Some(next) = frames.next_frame() {
            match next {
                Ok(frame) => {
                    if engine.handle_frame(frame).await == Flow::Close {
                        return Ok(());
                    }
                }
                Err(e) => warn!("discarding malformed frame from {peer_addr}: {e}"),
            }
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Frame>,
    peer_addr: SocketAddr,
) {
    while let Some(frame) = rx.recv().await {
        let bytes = match encode_frame(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("dropping {} for {peer_addr}: {e}", frame.message_type);
                continue;
            }
        };
        if let Err(e) = writer.write_all(&bytes).await {
            debug!("write to {peer_addr} failed: {e}");
            return;
        }
    }
    let _ = writer.shutdown().await;
}
