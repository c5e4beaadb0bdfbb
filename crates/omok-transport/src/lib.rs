//! Socket plumbing for the omok match server.
//!
//! The server only ever sees a [`Transport`] that hands out
//! [`Connection`]s carrying whole frames. The WebSocket implementation
//! lives behind the `websocket` feature, which is on by default.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one accepted connection for the lifetime of the process.
///
/// A reconnecting user arrives on a fresh id, which is how a late
/// disconnect from their old socket is told apart from a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id. Tests and alternative transports use this; the
    /// WebSocket transport allocates with [`ConnectionId::next`].
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next unused id.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener producing client connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Waits for the next client and completes any protocol upgrade.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// One client socket, framed.
///
/// `send` and `recv` take `&self` and may run at the same time on
/// different tasks: the handler parks in `recv` while room broadcasts
/// are written by the session's writer task.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Next frame from the client, or `Ok(None)` once it has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Remote address, for logs.
    fn peer_addr(&self) -> SocketAddr;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).get(), 7);
    }

    #[test]
    fn test_connection_id_next_never_repeats() {
        let ids: Vec<_> = (0..100).map(|_| ConnectionId::next()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
