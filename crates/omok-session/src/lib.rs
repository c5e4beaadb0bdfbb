//! Connection sessions for omok.
//!
//! This crate covers who is talking to the server:
//!
//! 1. **Authentication**: an external identity service issues tokens;
//!    the [`Authenticator`] trait is the seam where they are verified.
//! 2. **Sessions**: a successful handshake produces an
//!    [`AuthenticatedSession`], which is passed explicitly into every
//!    request handler instead of being read from connection-local state.
//! 3. **Connection registry**: [`SessionManager`] maps each user to the
//!    connection currently serving them and follows reconnects.
//!
//! ```text
//! Room / Orchestrator (above)  ← deliver events to users
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol + Transport (below)  ← UserId, ServerEvent, ConnectionId
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod session;

pub use auth::{Authenticator, TokenTable};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{AuthenticatedSession, Outbound, SessionConfig};
