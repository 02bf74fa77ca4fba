//! Keeps the token in the session between requests.

use std::sync::Arc;

use actix_session::Session;

use crate::http::error::{AuthenticationError, FirewallError};
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::{FirewallListener, ListenerKind, Supports};
use crate::http::security::session::SessionConfig;
use crate::http::security::token::{AuthenticationTrustResolver, Token};
use crate::http::security::user_provider::UserProvider;

/// Restores the token stored under `_security_<context>` when a request
/// starts and writes it back when the response leaves.
///
/// Stored users are refreshed through the provider. A user that vanished or
/// changed (password, account flags) invalidates the token.
pub struct ContextListener {
    context: String,
    user_provider: Arc<dyn UserProvider>,
    session: SessionConfig,
    trust_resolver: AuthenticationTrustResolver,
}

impl ContextListener {
    pub fn new(context: &str, user_provider: Arc<dyn UserProvider>, session: SessionConfig) -> Self {
        ContextListener {
            context: context.to_string(),
            user_provider,
            session,
            trust_resolver: AuthenticationTrustResolver,
        }
    }

    pub fn get_context(&self) -> &str {
        &self.context
    }

    fn session_key(&self) -> String {
        self.session.context_key(&self.context)
    }

    fn refresh(&self, mut token: Token) -> Option<Token> {
        let Some(user) = token.get_user().cloned() else {
            return Some(token);
        };
        match self.user_provider.refresh_user(&user) {
            Ok(fresh) if fresh.is_equal_to(&user) => {
                token.set_user(fresh);
                Some(token)
            }
            Ok(_) => {
                log::debug!("User \"{}\" changed, dropping the stored token", user.get_username());
                None
            }
            Err(AuthenticationError::UsernameNotFound) => {
                log::debug!("User \"{}\" no longer exists", user.get_username());
                None
            }
            Err(e) => {
                log::warn!("Could not refresh user \"{}\": {}", user.get_username(), e);
                None
            }
        }
    }

    /// Loads the stored token, if any.
    pub fn load(&self, session: &Session) -> Option<Token> {
        let key = self.session_key();
        match session.get::<Token>(&key) {
            Ok(Some(token)) => {
                let token = self.refresh(token);
                if token.is_none() {
                    session.remove(&key);
                }
                token
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Discarding unreadable token in \"{}\": {}", key, e);
                session.remove(&key);
                None
            }
        }
    }

    /// Writes the final token back. Anonymous tokens and no token at all
    /// clear the key.
    pub fn save(&self, session: &Session, token: Option<&Token>) {
        let key = self.session_key();
        match token {
            Some(token) if !self.trust_resolver.is_anonymous(Some(token)) => {
                if let Err(e) = session.insert(&key, token) {
                    log::warn!("Could not store the token in the session: {}", e);
                }
            }
            _ => {
                if session.get::<serde_json::Value>(&key).ok().flatten().is_some() {
                    session.remove(&key);
                }
            }
        }
    }
}

impl FirewallListener for ContextListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Context
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        Supports::from(event.token().is_none())
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        if !event.has_session(self.session.get_cookie_name()) {
            return Ok(());
        }
        if let Some(token) = self.load(&event.session()) {
            log::debug!("Restored token of \"{}\" from the session", token.get_username());
            event.set_token(Some(token));
        }
        Ok(())
    }
}
