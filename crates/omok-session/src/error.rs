//! Error types for the session layer.

use omok_protocol::UserId;
use omok_transport::ConnectionId;

/// Errors that can occur while authenticating or tracking sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token was missing, malformed, expired, or unknown to the
    /// [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The connection is not the one currently bound to the user. Happens
    /// when an old connection closes after the user already reconnected.
    #[error("{1} is not bound to user {0}")]
    NotBound(UserId, ConnectionId),
}
