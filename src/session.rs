//! Authenticated identity handed to the client at construction.
//!
//! The client never reads identity from ambient state. Whoever bootstraps the
//! login builds a [`Session`] and passes it to the presenter and the
//! connection manager.

use frames::UserId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub current_user_id: UserId,
    pub is_authenticated: bool,
    /// Value of the `session_token` cookie sent on HTTP and socket handshakes.
    pub token: Option<String>,
}

impl Session {
    #[must_use]
    pub fn authenticated(current_user_id: UserId, token: Option<String>) -> Self {
        Self { current_user_id, is_authenticated: true, token }
    }

    /// `Cookie` header value for this session, if a token is present.
    #[must_use]
    pub fn cookie(&self) -> Option<String> {
        self.token.as_deref().map(|token| format!("session_token={token}"))
    }
}
