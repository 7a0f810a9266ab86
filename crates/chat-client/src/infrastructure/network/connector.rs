//! Opening connections to the chat server.
//!
//! [`Connector`] is the seam between the runtime and the socket layer: the
//! runtime only sees a pair of boxed byte streams, so tests can hand it an
//! in-memory pipe instead of a TCP socket.

use async_trait::async_trait;
use chat_core::ProtocolError;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    /// TCP connection to the server failed.
    #[error("could not connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// An outbound frame could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Both directions of an open connection.
pub struct Connection {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

impl Connection {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens connections to a chat server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `addr` (`host:port`).
    async fn connect(&self, addr: String) -> Result<Connection, ClientNetworkError>;
}

/// [`Connector`] backed by real TCP sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: String) -> Result<Connection, ClientNetworkError> {
        let stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|source| ClientNetworkError::ConnectFailed {
                addr: addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        debug!("connected to {addr}");
        let (reader, writer) = stream.into_split();
        Ok(Connection::new(reader, writer))
    }
}
