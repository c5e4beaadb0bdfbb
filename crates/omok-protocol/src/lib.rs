//! Wire protocol for omok.
//!
//! This crate defines what clients and the match server say to each other:
//!
//! - **Identity & game vocabulary** ([`UserId`], [`RoomId`], [`Symbol`],
//!   [`MatchStatus`]) shared by every other crate.
//! - **Messages** ([`ClientRequest`], [`ServerEvent`]): the request and
//!   event catalogue, tagged with dotted names like `"room.makeMove"`.
//! - **Envelope** ([`Envelope`]): sequence number and timestamp around
//!   every frame.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, types out.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session / Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BoardRows, ClientRequest, EndReason, Envelope, LastMove, MatchStatus,
    MoveEntry, NegotiationView, Players, RoomErrorCode, RoomId, RoomSnapshot,
    ServerEvent, Symbol, UserId,
};
