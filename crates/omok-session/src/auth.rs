//! Authentication hook for validating user identity.
//!
//! Tokens are issued elsewhere (login service, JWT provider, ...). The
//! match server only needs to turn a token into a [`UserId`], so that is
//! the whole [`Authenticator`] contract.

use std::collections::HashMap;

use omok_protocol::UserId;

use crate::SessionError;

/// Validates a client's token and returns their identity.
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection task for the lifetime of the server.
///
/// # Example
///
/// ```rust
/// use omok_protocol::UserId;
/// use omok_session::{Authenticator, SessionError};
///
/// /// Uses the token itself as the numeric user id. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
///         let id: u64 = token.parse().map_err(|_| {
///             SessionError::AuthFailed("token must be a number".into())
///         })?;
///         Ok(UserId(id))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the token sent in the `auth` handshake.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the token is not acceptable.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, SessionError>> + Send;
}

/// An [`Authenticator`] backed by a fixed token → user table.
///
/// Useful for local play, tests, and deployments where an upstream
/// service provisions long-lived tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, UserId>,
}

impl TokenTable {
    /// Creates an empty table that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` for `user`, replacing any previous owner.
    pub fn insert(&mut self, token: impl Into<String>, user: UserId) {
        self.tokens.insert(token.into(), user);
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no tokens are registered.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, UserId)> for TokenTable {
    fn from_iter<I: IntoIterator<Item = (S, UserId)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().map(|(t, u)| (t.into(), u)).collect(),
        }
    }
}

impl Authenticator for TokenTable {
    async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
        if token.is_empty() {
            return Err(SessionError::AuthFailed("missing token".into()));
        }
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
    }
}
