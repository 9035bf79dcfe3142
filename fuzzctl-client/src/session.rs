//! Per-login session state shared by every request of a client.

use std::sync::RwLock;

use fuzzctl_core::UserContext;

/// CSRF token and user context of the current login.
///
/// The token is set on login and on refresh, and cleared on logout. Writers
/// simply overwrite: the last refresh wins.
#[derive(Debug, Default)]
pub struct Session {
    csrf_token: RwLock<Option<String>>,
    user: RwLock<Option<UserContext>>,
}

impl Session {
    /// Create an empty, logged-out session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current CSRF token, if one has been issued.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        self.csrf_token.read().expect("session token lock poisoned").clone()
    }

    /// Replace the CSRF token.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn set_csrf_token(&self, token: impl Into<String>) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut slot = self.csrf_token.write().expect("session token lock poisoned");
        *slot = Some(token.into());
    }

    /// User and project of the current login.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn user(&self) -> Option<UserContext> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        self.user.read().expect("session user lock poisoned").clone()
    }

    /// Record the logged-in user, e.g. after login or a project switch.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn set_user(&self, user: UserContext) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut slot = self.user.write().expect("session user lock poisoned");
        *slot = Some(user);
    }

    /// Forget the token and the user.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn clear(&self) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut token = self.csrf_token.write().expect("session token lock poisoned");
        *token = None;
        drop(token);

        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut user = self.user.write().expect("session user lock poisoned");
        *user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_lifecycle() {
        let session = Session::new();
        assert_eq!(session.csrf_token(), None, "new session has no token");

        session.set_csrf_token("t1");
        session.set_csrf_token("t2");
        assert_eq!(session.csrf_token().as_deref(), Some("t2"), "last writer wins");

        session.set_user(UserContext::new("u1", "p1"));
        session.clear();
        assert_eq!(session.csrf_token(), None, "logout clears the token");
        assert_eq!(session.user(), None, "logout clears the user");
    }
}
