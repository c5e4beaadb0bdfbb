//! `OmokServer` builder and server loop.
//!
//! This is the entry point for running a match server. It ties together
//! all the layers: transport → protocol → session → room.

use std::net::SocketAddr;
use std::sync::Arc;

use omok_protocol::{Codec, JsonCodec};
use omok_room::RoomConfig;
use omok_session::{Authenticator, SessionConfig};
use omok_store::MatchStore;
use omok_transport::{Transport, TransportError, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{OmokError, ServerConfig, SessionOrchestrator};

/// The current protocol version. Clients must send this in their
/// `auth` frame or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<A, S, C> {
    pub(crate) orchestrator: SessionOrchestrator<A, S>,
    pub(crate) codec: C,
    pub(crate) session: SessionConfig,
}

/// Builder for configuring and starting a match server.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use omok::prelude::*;
///
/// # async fn run() -> Result<(), OmokError> {
/// let tokens: TokenTable = [("alice", UserId(1)), ("bob", UserId(2))]
///     .into_iter()
///     .collect();
/// let server = OmokServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(tokens, Arc::new(MemoryStore::new()))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct OmokServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    session_config: SessionConfig,
}

impl OmokServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Starts from a loaded [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            room_config: config.room.clone(),
            session_config: config.session.clone(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration (board, turn clock, rematch window).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the session configuration (handshake and idle timeouts).
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<A, S>(
        self,
        auth: A,
        store: Arc<S>,
    ) -> Result<OmokServer<A, S, JsonCodec>, OmokError>
    where
        A: Authenticator,
        S: MatchStore,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            orchestrator: SessionOrchestrator::new(auth, store, self.room_config),
            codec: JsonCodec,
            session: self.session_config,
        });

        Ok(OmokServer { transport, state })
    }
}

impl Default for OmokServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A match server bound to its listening address.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct OmokServer<A, S, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, S, C>>,
}

impl OmokServer<(), (), ()> {
    /// Creates a new builder.
    pub fn builder() -> OmokServerBuilder {
        OmokServerBuilder::new()
    }
}

impl<A, S, C> OmokServer<A, S, C>
where
    A: Authenticator,
    S: MatchStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, OmokError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), OmokError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "omok server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e @ TransportError::Upgrade { .. }) => {
                    tracing::debug!(error = %e, "client dropped during upgrade");
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
