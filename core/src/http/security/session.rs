//! Session integration: fixation protection and the session keys used by
//! the firewall.
//!
//! Requires `actix_session::SessionMiddleware` to wrap the firewall;
//! without it, session reads come back empty and writes are dropped.
//!
//! # Example
//! ```rust,ignore
//! use actix_firewall_core::http::security::session::{SessionAuthenticationStrategy, SessionConfig};
//!
//! let config = SessionConfig::new()
//!     .cookie_name("id")
//!     .strategy(SessionAuthenticationStrategy::Invalidate);
//! ```

use actix_session::Session;

use crate::http::error::AuthenticationError;

// =============================================================================
// Session Authentication Strategy
// =============================================================================

/// What happens to the session when a user logs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionAuthenticationStrategy {
    /// Leave the session untouched.
    None,
    /// New session id, same data.
    #[default]
    Migrate,
    /// Drop all session data and start over under a new id.
    Invalidate,
}

impl SessionAuthenticationStrategy {
    pub fn on_authentication(&self, session: &Session) {
        match self {
            SessionAuthenticationStrategy::None => {}
            SessionAuthenticationStrategy::Migrate => {
                log::debug!("Migrating session on authentication");
                session.renew();
            }
            SessionAuthenticationStrategy::Invalidate => {
                log::debug!("Invalidating session on authentication");
                session.clear();
                session.renew();
            }
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct SessionConfig {
    cookie_name: String,
    strategy: SessionAuthenticationStrategy,
    context_key_prefix: String,
    last_username_key: String,
    last_error_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        SessionConfig {
            cookie_name: "id".to_string(),
            strategy: SessionAuthenticationStrategy::Migrate,
            context_key_prefix: "_security_".to_string(),
            last_username_key: "_security.last_username".to_string(),
            last_error_key: "_security.last_error".to_string(),
        }
    }

    /// Name of the session cookie, as configured on the session middleware
    /// (default: `id`). Its presence tells that the client holds a session.
    pub fn cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = name.to_string();
        self
    }

    pub fn strategy(mut self, strategy: SessionAuthenticationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn context_key_prefix(mut self, prefix: &str) -> Self {
        self.context_key_prefix = prefix.to_string();
        self
    }

    pub fn get_cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn get_strategy(&self) -> SessionAuthenticationStrategy {
        self.strategy
    }

    /// Session key holding the token of the firewall context `context`.
    pub fn context_key(&self, context: &str) -> String {
        format!("{}{}", self.context_key_prefix, context)
    }

    pub fn target_path_key(&self, firewall: &str) -> String {
        format!("_security.{}.target_path", firewall)
    }

    pub fn get_last_username_key(&self) -> &str {
        &self.last_username_key
    }

    pub fn get_last_error_key(&self) -> &str {
        &self.last_error_key
    }

    /// Remembers where an unauthenticated user was heading.
    pub fn save_target_path(&self, session: &Session, firewall: &str, uri: &str) {
        insert(session, &self.target_path_key(firewall), uri);
    }

    /// The saved target path, removed from the session.
    pub fn take_target_path(&self, session: &Session, firewall: &str) -> Option<String> {
        let key = self.target_path_key(firewall);
        let target = session.get::<String>(&key).ok().flatten();
        if target.is_some() {
            session.remove(&key);
        }
        target
    }

    pub fn set_last_username(&self, session: &Session, username: &str) {
        insert(session, &self.last_username_key, username);
    }

    pub fn get_last_username(&self, session: &Session) -> Option<String> {
        session.get::<String>(&self.last_username_key).ok().flatten()
    }

    /// Keeps the failure for the login page to display.
    pub fn set_last_error(&self, session: &Session, error: &AuthenticationError) {
        insert(session, &self.last_error_key, error.key());
    }

    pub fn remove_last_error(&self, session: &Session) {
        session.remove(&self.last_error_key);
    }

    pub fn get_last_error(&self, session: &Session) -> Option<String> {
        session.get::<String>(&self.last_error_key).ok().flatten()
    }
}

fn insert(session: &Session, key: &str, value: &str) {
    if let Err(e) = session.insert(key, value) {
        log::warn!("Could not write \"{}\" to the session: {}", key, e);
    }
}
