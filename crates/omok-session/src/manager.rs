//! The session manager: which connection currently speaks for each user.
//!
//! A user has at most one live binding. Connecting again (a reconnect, or
//! a second tab) moves the binding to the new connection; the old
//! connection's eventual close is then recognised as stale and ignored.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain `HashMap` with no locking of its own. The
//! orchestrator owns it behind a mutex, which keeps the lock scope
//! visible at the call site.

use std::collections::HashMap;

use omok_protocol::{ServerEvent, UserId};
use omok_transport::ConnectionId;

use crate::{AuthenticatedSession, Outbound, SessionError};

/// Registry of live sessions, keyed by user.
///
/// ```text
/// bind(user, conn-1) ──→ [conn-1] ──bind(user, conn-2)──→ [conn-2]
///                           │                                │
///                  unbind(conn-1): Ok            unbind(conn-1): NotBound
///                           ▼                                │
///                       [unbound]               unbind(conn-2): Ok
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<UserId, AuthenticatedSession>,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `user` to a freshly authenticated connection.
    ///
    /// Returns the new session and, if the user was already bound
    /// elsewhere, the session it displaced.
    pub fn bind(
        &mut self,
        user_id: UserId,
        conn_id: ConnectionId,
        outbound: Outbound,
    ) -> (AuthenticatedSession, Option<AuthenticatedSession>) {
        let session = AuthenticatedSession {
            user_id,
            conn_id,
            outbound,
        };
        let previous = self.sessions.insert(user_id, session.clone());

        match &previous {
            Some(old) => tracing::info!(
                %user_id,
                old_conn = %old.conn_id,
                new_conn = %conn_id,
                "session rebound to new connection"
            ),
            None => tracing::info!(%user_id, %conn_id, "session bound"),
        }

        (session, previous)
    }

    /// Releases the binding held by `session`'s connection.
    ///
    /// # Errors
    /// [`SessionError::NotBound`] if the user is bound to a different
    /// connection (or none); the existing binding is left alone.
    pub fn unbind(&mut self, session: &AuthenticatedSession) -> Result<(), SessionError> {
        match self.sessions.get(&session.user_id) {
            Some(current) if current.conn_id == session.conn_id => {
                self.sessions.remove(&session.user_id);
                tracing::info!(
                    user_id = %session.user_id,
                    conn_id = %session.conn_id,
                    "session unbound"
                );
                Ok(())
            }
            _ => Err(SessionError::NotBound(session.user_id, session.conn_id)),
        }
    }

    /// Returns `true` if `session` is still the user's live binding.
    pub fn is_current(&self, session: &AuthenticatedSession) -> bool {
        self.sessions
            .get(&session.user_id)
            .is_some_and(|s| s.conn_id == session.conn_id)
    }

    /// Looks up the live session for a user.
    pub fn get(&self, user_id: &UserId) -> Option<&AuthenticatedSession> {
        self.sessions.get(user_id)
    }

    /// Sends an event to whichever connection currently serves `user_id`.
    ///
    /// Returns `false` if the user is not connected.
    pub fn send_to(&self, user_id: &UserId, event: ServerEvent) -> bool {
        self.sessions
            .get(user_id)
            .is_some_and(|s| s.send(event))
    }

    /// Number of bound users.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
