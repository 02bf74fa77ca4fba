//! Anonymous tokens for visitors nobody recognised.

use std::sync::Arc;

use crate::http::error::FirewallError;
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::{FirewallListener, ListenerKind, Supports};
use crate::http::security::manager::AuthenticationManager;
use crate::http::security::token::Token;

/// Stores an `anon.` token when no other listener authenticated the request.
/// Failures are only logged.
pub struct AnonymousAuthenticationListener {
    secret: String,
    provider_key: String,
    manager: Option<Arc<dyn AuthenticationManager>>,
}

impl AnonymousAuthenticationListener {
    pub fn new(secret: &str, provider_key: &str) -> Self {
        AnonymousAuthenticationListener {
            secret: secret.to_string(),
            provider_key: provider_key.to_string(),
            manager: None,
        }
    }

    /// Have the token confirmed by `manager` before storing it.
    pub fn manager(mut self, manager: Arc<dyn AuthenticationManager>) -> Self {
        self.manager = Some(manager);
        self
    }
}

impl FirewallListener for AnonymousAuthenticationListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Anonymous
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        if event.token().is_some() {
            return Supports::No;
        }
        Supports::Lazy
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        if event.token().is_some() {
            return Ok(());
        }
        let token = Token::anonymous(&self.secret, &self.provider_key);
        let token = match &self.manager {
            Some(manager) => match manager.authenticate(token) {
                Ok(token) => token,
                Err(e) => {
                    log::info!("Anonymous authentication failed: {}", e);
                    return Ok(());
                }
            },
            None => token,
        };
        log::debug!("Populated token storage with an anonymous token");
        event.set_token(Some(token));
        Ok(())
    }
}
