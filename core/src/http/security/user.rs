//! User model for authentication and authorization.
//!
//! A [`User`] is what a [`UserProvider`](super::user_provider::UserProvider)
//! loads by username. Roles are stored without the `ROLE_` prefix; the
//! prefix only appears in access attributes such as `ROLE_ADMIN`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user account with roles, authorities and account status flags.
///
/// # Example
/// ```
/// use actix_firewall_core::http::security::User;
///
/// let user = User::new("admin".into(), "password".into())
///     .roles(&["ADMIN".into(), "USER".into()])
///     .authorities(&["users:read".into()]);
///
/// assert!(user.has_role("ADMIN"));
/// assert!(user.has_authority("users:read"));
/// assert!(user.is_enabled());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    username: String,
    password: String,
    roles: Vec<String>,
    authorities: Vec<String>,
    enabled: bool,
    account_non_locked: bool,
    account_non_expired: bool,
    credentials_non_expired: bool,
}

impl User {
    /// Creates a new user with username and plain-text password.
    pub fn new(username: String, password: String) -> Self {
        User {
            username,
            password,
            roles: Vec::new(),
            authorities: Vec::new(),
            enabled: true,
            account_non_locked: true,
            account_non_expired: true,
            credentials_non_expired: true,
        }
    }

    /// Creates a new user with username and pre-encoded password.
    pub fn with_encoded_password(username: &str, encoded_password: String) -> Self {
        User::new(username.to_string(), encoded_password)
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_password(&self) -> &str {
        &self.password
    }

    pub fn get_roles(&self) -> &[String] {
        &self.roles
    }

    pub fn get_authorities(&self) -> &[String] {
        &self.authorities
    }

    /// Adds roles to the user (builder pattern). Duplicates are ignored.
    pub fn roles(mut self, roles: &[String]) -> Self {
        for role in roles {
            if !self.roles.contains(role) {
                self.roles.push(role.clone());
            }
        }
        self
    }

    /// Adds authorities to the user (builder pattern). Duplicates are ignored.
    pub fn authorities(mut self, authorities: &[String]) -> Self {
        for authority in authorities {
            if !self.authorities.contains(authority) {
                self.authorities.push(authority.clone());
            }
        }
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.account_non_locked = !locked;
        self
    }

    pub fn account_expired(mut self, expired: bool) -> Self {
        self.account_non_expired = !expired;
        self
    }

    pub fn credentials_expired(mut self, expired: bool) -> Self {
        self.credentials_non_expired = !expired;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_account_non_locked(&self) -> bool {
        self.account_non_locked
    }

    pub fn is_account_non_expired(&self) -> bool {
        self.account_non_expired
    }

    pub fn is_credentials_non_expired(&self) -> bool {
        self.credentials_non_expired
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Checks if the user has ANY of the specified roles (OR logic).
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    /// Whether a freshly loaded copy of this user still describes the same
    /// account. A stored token is dropped when this turns false.
    pub fn is_equal_to(&self, other: &User) -> bool {
        self.username == other.username
            && self.password == other.password
            && self.enabled == other.enabled
            && self.account_non_locked == other.account_non_locked
            && self.account_non_expired == other.account_non_expired
            && self.credentials_non_expired == other.credentials_non_expired
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User {{ username: {}, roles: {:?}, authorities: {:?} }}",
            self.username, self.roles, self.authorities
        )
    }
}
