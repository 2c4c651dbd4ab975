//! # Auth Provider
//!
//! Pollable identity seam.
//!
//! The sync core never subscribes to auth state. Every operation reads
//! [`AuthProvider::current_user_id`] fresh at the moment it runs, so a
//! mid-batch sign-out takes effect on the next chat or message processed
//! and there is no stale-listener state to invalidate.

use parking_lot::RwLock;

/// Identity collaborator polled before each sync-enabled check
pub trait AuthProvider: Send + Sync {
    /// The signed-in user id, or None when signed out.
    ///
    /// The reserved guest id is never returned here; guest sessions count
    /// as signed out for sync purposes.
    fn current_user_id(&self) -> Option<String>;
}

/// Simple in-process auth state, for tests and embedding applications
/// that manage sign-in themselves
#[derive(Default)]
pub struct StaticAuth {
    user_id: RwLock<Option<String>>,
}

impl StaticAuth {
    /// Start signed out
    pub fn new() -> Self {
        Self::default()
    }

    /// Start signed in as `user_id`
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id.into())),
        }
    }

    /// Sign in as `user_id`
    pub fn sign_in(&self, user_id: impl Into<String>) {
        *self.user_id.write() = Some(user_id.into());
    }

    /// Sign out
    pub fn sign_out(&self) {
        *self.user_id.write() = None;
    }
}

impl AuthProvider for StaticAuth {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_auth_transitions() {
        let auth = StaticAuth::new();
        assert!(auth.current_user_id().is_none());

        auth.sign_in("user-1");
        assert_eq!(auth.current_user_id().as_deref(), Some("user-1"));

        auth.sign_out();
        assert!(auth.current_user_id().is_none());
    }
}
