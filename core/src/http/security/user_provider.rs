//! User providers and account status checks.

use std::collections::HashMap;

use crate::http::error::AuthenticationError;
use crate::http::security::user::User;

/// Loads users by username.
pub trait UserProvider: Send + Sync {
    /// Returns [`AuthenticationError::UsernameNotFound`] when no such user exists.
    fn load_user_by_username(&self, username: &str) -> Result<User, AuthenticationError>;

    /// Reloads a user, typically one restored from the session.
    fn refresh_user(&self, user: &User) -> Result<User, AuthenticationError> {
        self.load_user_by_username(user.get_username())
    }
}

/// In-memory user store.
///
/// # Example
/// ```
/// use actix_firewall_core::http::security::{InMemoryUserProvider, User, UserProvider};
///
/// let provider = InMemoryUserProvider::new()
///     .with_user(User::new("admin".into(), "password".into()).roles(&["ADMIN".into()]));
///
/// assert!(provider.load_user_by_username("admin").is_ok());
/// assert!(provider.load_user_by_username("nobody").is_err());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryUserProvider {
    users: HashMap<String, User>,
}

impl InMemoryUserProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user. A second user with the same name is ignored.
    pub fn with_user(mut self, user: User) -> Self {
        use std::collections::hash_map::Entry;
        match self.users.entry(user.get_username().to_string()) {
            Entry::Occupied(e) => {
                log::warn!("User {} already exists, skipping", e.key());
            }
            Entry::Vacant(e) => {
                e.insert(user);
            }
        }
        self
    }
}

impl UserProvider for InMemoryUserProvider {
    fn load_user_by_username(&self, username: &str) -> Result<User, AuthenticationError> {
        self.users
            .get(username)
            .cloned()
            .ok_or(AuthenticationError::UsernameNotFound)
    }
}

/// Account status checks run around credential verification.
pub trait UserChecker: Send + Sync {
    /// Runs before the credentials are checked.
    fn check_pre_auth(&self, user: &User) -> Result<(), AuthenticationError>;

    /// Runs once the credentials are accepted.
    fn check_post_auth(&self, user: &User) -> Result<(), AuthenticationError>;
}

/// Rejects locked, disabled and expired accounts, then expired credentials.
#[derive(Clone, Copy, Default)]
pub struct DefaultUserChecker;

impl UserChecker for DefaultUserChecker {
    fn check_pre_auth(&self, user: &User) -> Result<(), AuthenticationError> {
        if !user.is_account_non_locked() {
            return Err(AuthenticationError::AccountLocked);
        }
        if !user.is_enabled() {
            return Err(AuthenticationError::AccountDisabled);
        }
        if !user.is_account_non_expired() {
            return Err(AuthenticationError::AccountExpired);
        }
        Ok(())
    }

    fn check_post_auth(&self, user: &User) -> Result<(), AuthenticationError> {
        if !user.is_credentials_non_expired() {
            return Err(AuthenticationError::CredentialsExpired);
        }
        Ok(())
    }
}
