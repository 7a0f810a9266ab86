//! Terminal input.
//!
//! Standard input is read on a dedicated OS thread with blocking I/O.  A
//! blocked read cannot be cancelled, and keeping it off the Tokio runtime
//! lets the process exit while the thread is still waiting for a line.

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::infrastructure::network::runtime::ClientEvent;

/// Starts the stdin reader thread.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_stdin_reader(events: mpsc::UnboundedSender<ClientEvent>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("chat-stdin".to_string())
        .spawn(move || forward_lines(std::io::stdin().lock(), &events))?;
    Ok(())
}

/// Posts every line of `input` as [`ClientEvent::Input`], then
/// [`ClientEvent::InputClosed`].
pub fn forward_lines(input: impl BufRead, events: &mpsc::UnboundedSender<ClientEvent>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to read standard input: {e}");
                break;
            }
        };
        if events.send(ClientEvent::Input(line)).is_err() {
            debug!("runtime gone; stopping input reader");
            return;
        }
    }
    let _ = events.send(ClientEvent::InputClosed);
}
