//! Core protocol types for omok's wire format.
//!
//! Every type here is serialized to JSON and sent over the network.
//! Request and event tags use the dotted names clients already speak
//! (`"queue.join"`, `"room.makeMove"`, ...); fields are camelCase.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identity of an authenticated user.
///
/// Produced by the external token verifier; the match server never
/// invents user ids. Serialized as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// Opaque identifier of a room (one match, and any rematches played in it).
///
/// Random v4 UUIDs keep ids unique across server restarts, which matters
/// because they end up in persisted match records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(Uuid);

impl RoomId {
    /// Generates a fresh random room id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Game vocabulary
// ---------------------------------------------------------------------------

/// The marker a player places on the board. X always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// The opposing symbol.
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::O => f.write_str("O"),
        }
    }
}

/// Whether a match is still being played.
///
/// `Ended` is terminal: board, move log and winner are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Playing,
    Ended,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => f.write_str("Playing"),
            Self::Ended => f.write_str("Ended"),
        }
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// The mover completed a run of at least five.
    FiveInRow,
    /// The board filled up with no winner.
    Draw,
    /// A player resigned.
    Resign,
    /// The player to move let the turn clock run out.
    Timeout,
}

/// The two seats of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub x: UserId,
    pub o: UserId,
}

impl Players {
    /// Returns the symbol `user` plays, if they are seated here.
    pub fn symbol_of(&self, user: UserId) -> Option<Symbol> {
        if user == self.x {
            Some(Symbol::X)
        } else if user == self.o {
            Some(Symbol::O)
        } else {
            None
        }
    }

    /// Returns the user playing `symbol`.
    pub fn user(&self, symbol: Symbol) -> UserId {
        match symbol {
            Symbol::X => self.x,
            Symbol::O => self.o,
        }
    }

    /// Returns `true` if `user` holds either seat.
    pub fn contains(&self, user: UserId) -> bool {
        self.symbol_of(user).is_some()
    }

    /// Returns the other seat's user, if `user` is seated here.
    pub fn opponent_of(&self, user: UserId) -> Option<UserId> {
        self.symbol_of(user).map(|s| self.user(s.other()))
    }

    /// Both users, X first.
    pub fn both(&self) -> [UserId; 2] {
        [self.x, self.o]
    }

    /// The same two users with seats swapped.
    pub fn swapped(&self) -> Self {
        Self { x: self.o, o: self.x }
    }
}

/// One accepted move in a match's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEntry {
    pub x: u32,
    pub y: u32,
    pub by: UserId,
    pub t: DateTime<Utc>,
}

/// The most recent move, attached to `room.update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMove {
    pub x: u32,
    pub y: u32,
    pub symbol: Symbol,
    pub by: UserId,
}

/// Board rows as sent on the wire: `rows[y][x]` is `null`, `"X"` or `"O"`.
pub type BoardRows = Vec<Vec<Option<Symbol>>>;

/// A pending rematch handshake, as reported in `room.state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationView {
    pub requested_by: UserId,
    pub confirmed_by: Vec<UserId>,
    pub rejected_by: Vec<UserId>,
}

/// Full state of a room, returned by `room.state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub players: Players,
    pub board: BoardRows,
    pub turn: Symbol,
    pub moves: Vec<MoveEntry>,
    pub status: MatchStatus,
    pub winner_user_id: Option<UserId>,
    pub winner_symbol: Option<Symbol>,
    pub end_reason: Option<EndReason>,
    pub negotiation: Option<NegotiationView>,
    pub turn_deadline: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Reason codes carried by `room.error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomErrorCode {
    NotYourTurn,
    CellTaken,
    OutOfRange,
    RoomNotFound,
    NotAPlayer,
    GameEnded,
    GameInProgress,
    NoNegotiation,
    NegotiationPending,
    AlreadyConfirmed,
    RoomUnavailable,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask of the server.
///
/// The first frame of every connection must be [`ClientRequest::Auth`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientRequest {
    /// Handshake: protocol version plus the token issued by the identity
    /// service.
    #[serde(rename = "auth")]
    Auth { version: u32, token: String },

    /// Keep-alive; answered with `pong`.
    #[serde(rename = "ping")]
    Ping { client_time: u64 },

    /// Graceful goodbye; the server closes the connection.
    #[serde(rename = "disconnect")]
    Disconnect { reason: String },

    #[serde(rename = "queue.join")]
    JoinQueue,

    #[serde(rename = "queue.leave")]
    LeaveQueue,

    #[serde(rename = "room.makeMove")]
    MakeMove { room_id: RoomId, x: i32, y: i32 },

    #[serde(rename = "room.resign")]
    Resign { room_id: RoomId },

    #[serde(rename = "room.state")]
    RoomState { room_id: RoomId },

    #[serde(rename = "room.newGame")]
    NewGame { room_id: RoomId },

    #[serde(rename = "room.confirmNewGame")]
    ConfirmNewGame { room_id: RoomId },

    #[serde(rename = "room.rejectNewGame")]
    RejectNewGame { room_id: RoomId },
}

impl ClientRequest {
    /// The room this request targets, for in-room requests.
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::MakeMove { room_id, .. }
            | Self::Resign { room_id }
            | Self::RoomState { room_id }
            | Self::NewGame { room_id }
            | Self::ConfirmNewGame { room_id }
            | Self::RejectNewGame { room_id } => Some(*room_id),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Handshake accepted.
    #[serde(rename = "auth.ok")]
    AuthOk { user_id: UserId, server_time: u64 },

    /// Connection-level failure. `code` follows HTTP conventions
    /// (400 bad request, 401 unauthorized).
    #[serde(rename = "error")]
    Error { code: u16, message: String },

    #[serde(rename = "pong")]
    Pong { client_time: u64, server_time: u64 },

    #[serde(rename = "queue.waiting")]
    QueueWaiting,

    #[serde(rename = "queue.left")]
    QueueLeft,

    #[serde(rename = "queue.error")]
    QueueError { message: String },

    #[serde(rename = "queue.matched")]
    QueueMatched {
        room_id: RoomId,
        symbol: Symbol,
        opponent: UserId,
    },

    #[serde(rename = "room.update")]
    RoomUpdate {
        room_id: RoomId,
        board: BoardRows,
        turn: Symbol,
        last_move: Option<LastMove>,
        status: MatchStatus,
        turn_deadline: Option<DateTime<Utc>>,
    },

    #[serde(rename = "room.end")]
    RoomEnd {
        room_id: RoomId,
        winner_user_id: Option<UserId>,
        winner_symbol: Option<Symbol>,
        reason: EndReason,
    },

    #[serde(rename = "room.state")]
    RoomState { state: RoomSnapshot },

    #[serde(rename = "room.error")]
    RoomError { code: RoomErrorCode, message: String },

    #[serde(rename = "room.newGameRequestSent")]
    NewGameRequestSent { room_id: RoomId },

    #[serde(rename = "room.newGameRequest")]
    NewGameRequest { room_id: RoomId, requested_by: UserId },

    #[serde(rename = "room.newGameConfirmed")]
    NewGameConfirmed { room_id: RoomId, user_id: UserId },

    #[serde(rename = "room.newGameRejected")]
    NewGameRejected { room_id: RoomId, user_id: UserId },

    #[serde(rename = "room.newGame")]
    NewGame {
        room_id: RoomId,
        symbol: Symbol,
        opponent: UserId,
    },

    #[serde(rename = "room.timeout")]
    RoomTimeout {
        room_id: RoomId,
        timeout_player_id: UserId,
        winner_id: UserId,
        winner_symbol: Symbol,
    },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level frame. Every message on the wire is an `Envelope`.
///
/// The server numbers its outbound frames per connection; clients may
/// omit `seq` and `timestamp` entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Per-connection sequence number.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the connection was accepted.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: T,
}

// =========================================================================
// Tests
// =========================================================================
