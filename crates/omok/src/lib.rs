//! # omok
//!
//! A real-time, two-player Gomoku match server.
//!
//! Players authenticate over WebSocket, wait in a FIFO queue, and are
//! seated in pairs in a room that enforces turns, detects five in a row,
//! ends abandoned matches on a 30 second turn clock, and negotiates
//! rematches. Finished matches are handed to a [`MatchStore`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use omok::prelude::*;
//!
//! # async fn run() -> Result<(), OmokError> {
//! let config = ServerConfig::from_env()?;
//! let tokens: TokenTable = config.tokens.iter().cloned().collect();
//! let store = Arc::new(JsonlStore::new(&config.store_path));
//! let server = OmokServerBuilder::from_config(&config)
//!     .build(tokens, store)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod orchestrator;
mod server;

pub use config::ServerConfig;
pub use omok_store::MatchStore;
pub use error::{ConfigError, OmokError};
pub use orchestrator::{Flow, SessionOrchestrator};
pub use server::{OmokServer, OmokServerBuilder, PROTOCOL_VERSION};

/// Everything needed to run or talk to a server.
pub mod prelude {
    pub use crate::{
        ConfigError, Flow, OmokError, OmokServer, OmokServerBuilder, PROTOCOL_VERSION,
        ServerConfig, SessionOrchestrator,
    };
    pub use omok_protocol::{
        ClientRequest, Codec, EndReason, Envelope, JsonCodec, MatchStatus, Players, RoomErrorCode,
        RoomId, RoomSnapshot, ServerEvent, Symbol, UserId,
    };
    pub use omok_room::{RoomConfig, RoomError};
    pub use omok_session::{AuthenticatedSession, Authenticator, SessionConfig, SessionError, TokenTable};
    pub use omok_store::{JsonlStore, MatchRecord, MatchStore, MemoryStore, StoreError};
}
