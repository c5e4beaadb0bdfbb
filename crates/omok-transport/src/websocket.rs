//! WebSocket transport on top of `tokio-tungstenite`.
//!
//! Each socket is split into a write half and a read half behind
//! separate locks, so a handler waiting in `recv` never holds up a
//! broadcast going out through `send`.

use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

type Socket = WebSocketStream<TcpStream>;

/// Listens for WebSocket clients on a TCP address.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds the listener. Use port 0 to let the OS pick one.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "listening for websocket clients");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (stream, peer) = self.listener.accept().await?;
        let socket = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|source| TransportError::Upgrade { peer, source })?;

        let id = ConnectionId::next();
        tracing::debug!(conn_id = %id, %peer, "websocket upgraded");

        let (writer, reader) = socket.split();
        Ok(WebSocketConnection {
            id,
            peer,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }
}

/// An upgraded client socket.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    writer: Mutex<SplitSink<Socket, Message>>,
    reader: Mutex<SplitStream<Socket>>,
}

/// Wraps an outbound frame. JSON is valid UTF-8 and goes out as a text
/// message so browsers get a string.
fn outbound_message(frame: &[u8]) -> Message {
    match std::str::from_utf8(frame) {
        Ok(text) => Message::text(text.to_owned()),
        Err(_) => Message::binary(frame.to_vec()),
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.send(outbound_message(frame)).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        while let Some(message) = reader.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text.as_bytes().to_vec())),
                Message::Binary(bytes) => return Ok(Some(bytes.to_vec())),
                Message::Close(_) => return Ok(None),
                // tungstenite answers pings on its own
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer.lock().await.close().await?;
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
