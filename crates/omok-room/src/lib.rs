//! Matchmaking and match rooms for omok.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! [`Room`] state machine, its turn clock, and its rematch window.
//!
//! # Key types
//!
//! - [`Board`] / [`is_win`]: the board and win detection
//! - [`Room`]: one match (moves, resignation, timeout, rematch handshake)
//! - [`MatchQueue`]: FIFO pairing of waiting players
//! - [`RoomHandle`]: send requests to a running room actor
//! - [`RoomRegistry`]: active rooms and user → room index
//! - [`RoomConfig`]: board size, timeouts, channel sizes

mod actor;
mod board;
mod config;
mod error;
mod negotiation;
mod queue;
mod registry;
mod room;

pub use actor::{RoomHandle, RoomRequest, spawn_room};
pub use board::{Board, WIN_LENGTH, is_win, is_win_with};
pub use config::RoomConfig;
pub use error::RoomError;
pub use negotiation::Negotiation;
pub use queue::{MatchQueue, QueueEntry};
pub use registry::RoomRegistry;
pub use room::{ConfirmOutcome, MoveOutcome, Room, TimedOut, Winner, random_seating};
