//! TCP accept loop.
//!
//! Binds the listening socket and hands every accepted connection to its own
//! Tokio task running [`handle_connection`].  The loop itself never touches a
//! connection's I/O, so a slow client cannot delay new logins.
//!
//! Shutdown is cooperative: `accept()` is wrapped in a short timeout and the
//! shared `running` flag is checked between attempts.  Connections already
//! being served keep running until their peer goes away.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{error, info};

use crate::application::ServerState;
use crate::infrastructure::network::connection::handle_connection;

const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Error type for listener setup.
#[derive(Debug, Error)]
pub enum ServerNetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Binds `addr` and serves connections until `running` is cleared.
///
/// # Errors
///
/// Returns [`ServerNetworkError::BindFailed`] if the address cannot be bound.
pub async fn run_server(
    addr: &str,
    state: Arc<ServerState>,
    running: Arc<AtomicBool>,
) -> Result<(), ServerNetworkError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerNetworkError::BindFailed {
            addr: addr.to_string(),
            source,
        })?;
    info!("chat server listening on {addr}");

    serve(listener, state, running).await;
    Ok(())
}

/// Runs the accept loop on an already bound listener.
///
/// A failed `accept()` is logged and the loop continues.
pub async fn serve(listener: TcpListener, state: Arc<ServerState>, running: Arc<AtomicBool>) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!("new connection from {peer_addr}");
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, state).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within the poll interval.
            }
        }
    }
}
