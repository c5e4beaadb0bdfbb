//! Error types for the room layer.
//!
//! Every variant is a rejection of one request: the room it concerns is
//! left untouched and only the requester hears about it.

use omok_protocol::{RoomErrorCode, RoomId, ServerEvent, Symbol, UserId};

/// Why a room request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The requester holds a seat but it is the other symbol's turn.
    #[error("not your turn: {turn} to move")]
    NotYourTurn { turn: Symbol },

    /// The target cell already holds a stone.
    #[error("cell ({x}, {y}) is occupied")]
    CellTaken { x: u32, y: u32 },

    /// The coordinates are off the board.
    #[error("({x}, {y}) is outside the {size}x{size} board")]
    OutOfRange { x: i32, y: i32, size: usize },

    /// No active room has this id.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The requester holds no seat in this room.
    #[error("user {0} is not a player in room {1}")]
    NotAPlayer(UserId, RoomId),

    /// The match is over; gameplay requests are refused.
    #[error("match in room {0} has ended")]
    GameEnded(RoomId),

    /// Rematch requests are only valid once the match has ended.
    #[error("match in room {0} is still in progress")]
    GameInProgress(RoomId),

    /// Confirm/reject with no pending rematch request.
    #[error("no rematch request pending in room {0}")]
    NoNegotiation(RoomId),

    /// The opponent already asked for a rematch; confirm or reject it.
    #[error("rematch already requested by {0}")]
    NegotiationPending(UserId),

    #[error("user {0} already confirmed the rematch")]
    AlreadyConfirmed(UserId),

    /// A seat of this room has since been matched into another room, so
    /// the room can no longer be restarted.
    #[error("player {user} has moved on to room {room_id}")]
    PlayerMovedOn { user: UserId, room_id: RoomId },

    /// The room's actor has stopped or its channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// The reason code sent to clients.
    pub fn code(&self) -> RoomErrorCode {
        match self {
            Self::NotYourTurn { .. } => RoomErrorCode::NotYourTurn,
            Self::CellTaken { .. } => RoomErrorCode::CellTaken,
            Self::OutOfRange { .. } => RoomErrorCode::OutOfRange,
            Self::NotFound(_) => RoomErrorCode::RoomNotFound,
            Self::NotAPlayer(..) => RoomErrorCode::NotAPlayer,
            Self::GameEnded(_) => RoomErrorCode::GameEnded,
            Self::GameInProgress(_) => RoomErrorCode::GameInProgress,
            Self::NoNegotiation(_) => RoomErrorCode::NoNegotiation,
            Self::NegotiationPending(_) => RoomErrorCode::NegotiationPending,
            Self::AlreadyConfirmed(_) => RoomErrorCode::AlreadyConfirmed,
            Self::PlayerMovedOn { .. } => RoomErrorCode::GameInProgress,
            Self::Unavailable(_) => RoomErrorCode::RoomUnavailable,
        }
    }

    /// The `room.error` event for the requester.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::RoomError {
            code: self.code(),
            message: self.to_string(),
        }
    }
}
