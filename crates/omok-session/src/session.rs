//! Session types: the authenticated identity bound to one connection.

use std::time::Duration;

use omok_protocol::{ServerEvent, UserId};
use omok_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel feeding a connection's writer task.
///
/// Rooms and the orchestrator push events here; the connection handler
/// drains it onto the socket. Sends to a closed channel are dropped,
/// which is exactly what should happen for a user who just went away.
pub type Outbound = mpsc::UnboundedSender<ServerEvent>;

/// Timeouts governing a connection's lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a new connection has to send its `auth` frame.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing (not even `ping`) for this long is
    /// closed and treated as a disconnect.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Proof that a connection passed the handshake.
///
/// Created once at connect time and threaded through every request
/// handler, so no handler ever has to ask "who is this?".
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    /// Who the token said this is.
    pub user_id: UserId,
    /// Which connection carries the session.
    pub conn_id: ConnectionId,
    /// Where events for this connection go.
    pub outbound: Outbound,
}

impl AuthenticatedSession {
    /// Sends an event to this session's connection only.
    ///
    /// Returns `false` if the connection's writer is already gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.outbound.send(event).is_ok()
    }
}
