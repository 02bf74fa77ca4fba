//! Logs users in from their remember-me cookie.

use std::sync::Arc;

use crate::http::error::FirewallError;
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::{FirewallListener, ListenerKind, LoginService, Supports};
use crate::http::security::remember_me::RememberMeServices;

/// Runs when no token is stored yet. The services turn the cookie into a
/// token and the manager confirms it.
///
/// A token the manager rejects makes the services drop the cookie. With
/// `catch_exceptions` off the error is raised as well.
pub struct RememberMeListener {
    login: LoginService,
    services: Arc<dyn RememberMeServices>,
    catch_exceptions: bool,
}

impl RememberMeListener {
    pub fn new(login: LoginService, services: Arc<dyn RememberMeServices>) -> Self {
        RememberMeListener {
            login,
            services,
            catch_exceptions: true,
        }
    }

    pub fn catch_exceptions(mut self, catch: bool) -> Self {
        self.catch_exceptions = catch;
        self
    }
}

impl FirewallListener for RememberMeListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::RememberMe
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
        let Some(token) = self.services.auto_login(event) else {
            return Ok(());
        };

        match self.login.authenticate(token) {
            Ok(token) => {
                let session = self.login.get_session_config();
                if !self.login.is_stateless() && event.has_session(session.get_cookie_name()) {
                    session.get_strategy().on_authentication(&event.session());
                }
                log::debug!(
                    "Populated token storage with a remember-me token for \"{}\"",
                    token.get_username()
                );
                event.set_token(Some(token));
                Ok(())
            }
            Err(error) => {
                log::warn!("Remember-me token rejected by the authentication manager: {}", error);
                self.services.login_fail(event);
                if self.catch_exceptions {
                    Ok(())
                } else {
                    Err(error.into())
                }
            }
        }
    }
}
