use std::io;

#[cfg(feature = "websocket")]
use tokio_tungstenite::tungstenite::Error as WsError;

/// Errors raised by the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Socket-level failure while accepting or querying the listener.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A TCP client connected but never completed the WebSocket upgrade.
    #[cfg(feature = "websocket")]
    #[error("websocket upgrade from {peer} failed: {source}")]
    Upgrade {
        peer: std::net::SocketAddr,
        #[source]
        source: WsError,
    },

    /// The peer is gone, or the connection was already closed locally.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Any other WebSocket protocol failure.
    #[cfg(feature = "websocket")]
    #[error("websocket error: {0}")]
    WebSocket(#[source] WsError),
}

#[cfg(feature = "websocket")]
impl From<WsError> for TransportError {
    fn from(error: WsError) -> Self {
        match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                Self::ConnectionClosed(error.to_string())
            }
            other => Self::WebSocket(other),
        }
    }
}
