//! The persisted shape of one finished match.

use chrono::{DateTime, Utc};
use omok_protocol::{EndReason, MatchStatus, MoveEntry, Players, RoomId, Symbol, UserId};
use serde::{Deserialize, Serialize};

/// Everything worth keeping about a finished match.
///
/// ```json
/// { "roomId": "…", "players": { "x": 1, "o": 2 },
///   "moves": [{ "x": 7, "y": 7, "by": 1, "t": "…" }],
///   "winnerUserId": 1, "winnerSymbol": "X", "status": "Ended",
///   "endReason": "fiveInRow", "startedAt": "…", "endedAt": "…" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub room_id: RoomId,
    pub players: Players,
    pub moves: Vec<MoveEntry>,
    pub winner_user_id: Option<UserId>,
    pub winner_symbol: Option<Symbol>,
    pub status: MatchStatus,
    pub end_reason: EndReason,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl MatchRecord {
    /// `true` if the match ended without a winner.
    pub fn is_draw(&self) -> bool {
        self.winner_user_id.is_none()
    }
}
