//! The room state machine: one match between two seated players.
//!
//! [`Room`] is plain synchronous data. Every transition is a method that
//! either applies completely or returns a [`RoomError`] and leaves the
//! room exactly as it was. Timers, broadcasting and persistence live in
//! the room actor, which is the only owner of a live `Room`.
//!
//! ```text
//!            make_move (win / full board)
//!            resign
//!            expire_turn
//! [Playing] ───────────────────────────────→ [Ended]
//!     ↑                                         │ request / confirm / reject
//!     └──────── rematch() (fresh Room) ─────────┘ (negotiation)
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use omok_protocol::{
    EndReason, LastMove, MatchStatus, MoveEntry, Players, RoomId, RoomSnapshot, ServerEvent,
    Symbol, UserId,
};
use omok_store::MatchRecord;
use rand::Rng;
use std::time::Duration;

use crate::board::{Board, is_win_with};
use crate::{Negotiation, RoomConfig, RoomError};

/// The winning seat of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Winner {
    pub user_id: UserId,
    pub symbol: Symbol,
}

/// What an accepted move did to the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Play goes on; the other symbol is now to move.
    Continue,
    /// The mover completed a winning run.
    Won(Winner),
    /// The board filled up without a winner.
    Draw,
}

impl MoveOutcome {
    /// `true` if the move ended the match.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// A turn clock that ran out on a live match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut {
    /// The player who was to move.
    pub expired: UserId,
    /// The other player, who wins.
    pub winner: Winner,
}

/// Progress of a rematch negotiation after a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Still waiting on the other player.
    Waiting,
    /// Both players confirmed; the room should be replaced via
    /// [`Room::rematch`].
    Unanimous,
}

/// Seats two users, flipping a coin for who plays X.
pub fn random_seating(a: UserId, b: UserId) -> Players {
    if rand::rng().random_bool(0.5) {
        Players { x: a, o: b }
    } else {
        Players { x: b, o: a }
    }
}

/// One match instance.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    config: RoomConfig,
    players: Players,
    board: Board,
    turn: Symbol,
    moves: Vec<MoveEntry>,
    status: MatchStatus,
    winner: Option<Winner>,
    end_reason: Option<EndReason>,
    negotiation: Option<Negotiation>,
    turn_deadline: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Starts a match with X to move and the turn clock running.
    pub fn new(id: RoomId, players: Players, config: RoomConfig) -> Self {
        let now = Utc::now();
        Self {
            id,
            board: Board::new(config.board_size),
            turn_deadline: deadline_after(now, config.turn_timeout),
            config,
            players,
            turn: Symbol::X,
            moves: Vec::new(),
            status: MatchStatus::Playing,
            winner: None,
            end_reason: None,
            negotiation: None,
            started_at: now,
            ended_at: None,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn players(&self) -> Players {
        self.players
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The symbol to move. Frozen once the match has ended.
    pub fn turn(&self) -> Symbol {
        self.turn
    }

    pub fn moves(&self) -> &[MoveEntry] {
        &self.moves
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == MatchStatus::Playing
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn negotiation(&self) -> Option<&Negotiation> {
        self.negotiation.as_ref()
    }

    /// Wall-clock deadline of the current turn; `None` once ended.
    pub fn turn_deadline(&self) -> Option<DateTime<Utc>> {
        self.turn_deadline
    }

    /// The most recent accepted move.
    pub fn last_move(&self) -> Option<LastMove> {
        let entry = self.moves.last()?;
        let symbol = self.players.symbol_of(entry.by)?;
        Some(LastMove {
            x: entry.x,
            y: entry.y,
            symbol,
            by: entry.by,
        })
    }

    // -----------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------

    /// Places the mover's symbol at `(x, y)`.
    ///
    /// # Errors
    /// [`RoomError::NotAPlayer`], [`RoomError::GameEnded`],
    /// [`RoomError::NotYourTurn`], [`RoomError::OutOfRange`] or
    /// [`RoomError::CellTaken`], checked in that order. A rejected move
    /// changes nothing.
    pub fn make_move(&mut self, user: UserId, x: i32, y: i32) -> Result<MoveOutcome, RoomError> {
        let symbol = self.seat(user)?;
        self.ensure_playing()?;
        if symbol != self.turn {
            return Err(RoomError::NotYourTurn { turn: self.turn });
        }
        let (cx, cy) = self.board.cell(x, y).ok_or(RoomError::OutOfRange {
            x,
            y,
            size: self.board.size(),
        })?;
        // Board coordinates are bounded by MAX_BOARD_SIZE, so they fit u32.
        let (wx, wy) = (cx as u32, cy as u32);
        if !self.board.place(cx, cy, symbol) {
            return Err(RoomError::CellTaken { x: wx, y: wy });
        }

        let now = Utc::now();
        self.moves.push(MoveEntry {
            x: wx,
            y: wy,
            by: user,
            t: now,
        });

        if is_win_with(&self.board, cx, cy, self.config.win_length) {
            let winner = Winner {
                user_id: user,
                symbol,
            };
            self.finish(Some(winner), EndReason::FiveInRow, now);
            Ok(MoveOutcome::Won(winner))
        } else if self.board.is_full() {
            self.finish(None, EndReason::Draw, now);
            Ok(MoveOutcome::Draw)
        } else {
            self.turn = symbol.other();
            self.turn_deadline = deadline_after(now, self.config.turn_timeout);
            Ok(MoveOutcome::Continue)
        }
    }

    /// Ends the match with the other player as winner.
    ///
    /// # Errors
    /// [`RoomError::NotAPlayer`] or [`RoomError::GameEnded`].
    pub fn resign(&mut self, user: UserId) -> Result<Winner, RoomError> {
        let symbol = self.seat(user)?;
        self.ensure_playing()?;
        let winner_symbol = symbol.other();
        let winner = Winner {
            user_id: self.players.user(winner_symbol),
            symbol: winner_symbol,
        };
        self.finish(Some(winner), EndReason::Resign, Utc::now());
        Ok(winner)
    }

    /// Applies a turn-clock expiry.
    ///
    /// Returns `None` if the match already ended; a late expiry never
    /// produces a second result.
    pub fn expire_turn(&mut self) -> Option<TimedOut> {
        if !self.is_playing() {
            return None;
        }
        let expired = self.players.user(self.turn);
        let winner_symbol = self.turn.other();
        let winner = Winner {
            user_id: self.players.user(winner_symbol),
            symbol: winner_symbol,
        };
        self.finish(Some(winner), EndReason::Timeout, Utc::now());
        Some(TimedOut { expired, winner })
    }

    /// Opens a rematch negotiation, or restarts the caller's own.
    ///
    /// # Errors
    /// [`RoomError::NotAPlayer`], [`RoomError::GameInProgress`], or
    /// [`RoomError::NegotiationPending`] if the opponent already asked.
    pub fn request_new_game(&mut self, user: UserId) -> Result<(), RoomError> {
        self.seat(user)?;
        self.ensure_ended()?;
        if let Some(pending) = &self.negotiation {
            if pending.requested_by() != user {
                return Err(RoomError::NegotiationPending(pending.requested_by()));
            }
        }
        self.negotiation = Some(Negotiation::new(user));
        Ok(())
    }

    /// Adds `user`'s confirmation to the pending negotiation.
    ///
    /// [`ConfirmOutcome::Unanimous`] only once both seats confirmed; the
    /// requester's own confirmation never suffices alone.
    ///
    /// # Errors
    /// [`RoomError::NotAPlayer`], [`RoomError::GameInProgress`],
    /// [`RoomError::NoNegotiation`] or [`RoomError::AlreadyConfirmed`].
    pub fn confirm_new_game(&mut self, user: UserId) -> Result<ConfirmOutcome, RoomError> {
        self.seat(user)?;
        self.ensure_ended()?;
        let seats = self.players.both();
        let negotiation = self
            .negotiation
            .as_mut()
            .ok_or(RoomError::NoNegotiation(self.id))?;
        if !negotiation.confirm(user) {
            return Err(RoomError::AlreadyConfirmed(user));
        }
        if negotiation.is_unanimous(&seats) {
            Ok(ConfirmOutcome::Unanimous)
        } else {
            Ok(ConfirmOutcome::Waiting)
        }
    }

    /// Rejects and clears the pending negotiation. The requester may
    /// reject to withdraw. The room stays ended.
    ///
    /// Returns the closed negotiation.
    ///
    /// # Errors
    /// [`RoomError::NotAPlayer`], [`RoomError::GameInProgress`] or
    /// [`RoomError::NoNegotiation`].
    pub fn reject_new_game(&mut self, user: UserId) -> Result<Negotiation, RoomError> {
        self.seat(user)?;
        self.ensure_ended()?;
        let mut negotiation = self
            .negotiation
            .take()
            .ok_or(RoomError::NoNegotiation(self.id))?;
        negotiation.reject(user);
        Ok(negotiation)
    }

    /// A fresh match for the same two users under the same id, with seats
    /// swapped so the previous O player opens.
    pub fn rematch(&self) -> Room {
        Room::new(self.id, self.players.swapped(), self.config.clone())
    }

    // -----------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------

    /// Full state for `room.state`.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id,
            players: self.players,
            board: self.board.rows(),
            turn: self.turn,
            moves: self.moves.clone(),
            status: self.status,
            winner_user_id: self.winner.map(|w| w.user_id),
            winner_symbol: self.winner.map(|w| w.symbol),
            end_reason: self.end_reason,
            negotiation: self.negotiation.as_ref().map(Negotiation::view),
            turn_deadline: self.turn_deadline,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    /// The `room.update` broadcast after a start or a move.
    pub fn update_event(&self) -> ServerEvent {
        ServerEvent::RoomUpdate {
            room_id: self.id,
            board: self.board.rows(),
            turn: self.turn,
            last_move: self.last_move(),
            status: self.status,
            turn_deadline: self.turn_deadline,
        }
    }

    /// The `room.end` broadcast; `None` while playing.
    pub fn end_event(&self) -> Option<ServerEvent> {
        Some(ServerEvent::RoomEnd {
            room_id: self.id,
            winner_user_id: self.winner.map(|w| w.user_id),
            winner_symbol: self.winner.map(|w| w.symbol),
            reason: self.end_reason?,
        })
    }

    /// The durable record of a finished match; `None` while playing.
    pub fn record(&self) -> Option<MatchRecord> {
        Some(MatchRecord {
            room_id: self.id,
            players: self.players,
            moves: self.moves.clone(),
            winner_user_id: self.winner.map(|w| w.user_id),
            winner_symbol: self.winner.map(|w| w.symbol),
            status: self.status,
            end_reason: self.end_reason?,
            started_at: self.started_at,
            ended_at: self.ended_at?,
        })
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn seat(&self, user: UserId) -> Result<Symbol, RoomError> {
        self.players
            .symbol_of(user)
            .ok_or(RoomError::NotAPlayer(user, self.id))
    }

    fn ensure_playing(&self) -> Result<(), RoomError> {
        if self.is_playing() {
            Ok(())
        } else {
            Err(RoomError::GameEnded(self.id))
        }
    }

    fn ensure_ended(&self) -> Result<(), RoomError> {
        if self.is_playing() {
            Err(RoomError::GameInProgress(self.id))
        } else {
            Ok(())
        }
    }

    fn finish(&mut self, winner: Option<Winner>, reason: EndReason, now: DateTime<Utc>) {
        self.status = MatchStatus::Ended;
        self.winner = winner;
        self.end_reason = Some(reason);
        self.ended_at = Some(now);
        self.turn_deadline = None;
    }
}

fn deadline_after(now: DateTime<Utc>, timeout: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(timeout)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
}
