//! Unified error type for the omok server.

use omok_protocol::ProtocolError;
use omok_room::RoomError;
use omok_session::SessionError;
use omok_store::StoreError;
use omok_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum OmokError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (authentication, stale binding).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level rejection.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A match record could not be stored.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The server configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// An environment variable held a value the server cannot use.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: {value:?} is not a whole number of seconds")]
    InvalidSeconds { var: &'static str, value: String },

    #[error("{var}: entry {entry:?} is not of the form token=userId")]
    InvalidToken { var: &'static str, entry: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}
