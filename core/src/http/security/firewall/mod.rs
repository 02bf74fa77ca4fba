//! The firewall pipeline.
//!
//! A firewall is an ordered list of [`FirewallListener`]s. For every request
//! the listeners run one after the other; the first one that sets a response
//! ends the chain and any error is handed to the [`ExceptionListener`].
//!
//! Listeners registered by [`FirewallBuilder`] run in this order:
//!
//! 1. [`ChannelListener`]
//! 2. [`ContextListener`] (stateful firewalls only)
//! 3. [`PreAuthenticatedListener`]
//! 4. [`UsernamePasswordFormAuthenticationListener`]
//! 5. [`UsernamePasswordJsonAuthenticationListener`]
//! 6. [`BasicAuthenticationListener`]
//! 7. [`RememberMeListener`]
//! 8. [`AnonymousAuthenticationListener`]
//! 9. custom listeners
//! 10. [`SwitchUserListener`]
//! 11. [`LogoutListener`]
//! 12. [`AccessListener`]

use std::sync::Arc;

use crate::http::error::{AuthenticationError, FirewallError};
use crate::http::security::event::RequestEvent;
use crate::http::security::events::{EventDispatcher, SecurityEvent};
use crate::http::security::manager::AuthenticationManager;
use crate::http::security::remember_me::RememberMeServices;
use crate::http::security::session::SessionConfig;
use crate::http::security::token::Token;

pub mod access;
pub mod anonymous;
pub mod basic;
pub mod channel;
pub mod context;
pub mod context_listener;
pub mod exception;
pub mod form_login;
pub mod json_login;
pub mod logout;
pub mod map;
pub mod pre_auth;
pub mod remember_me;
pub mod switch_user;

pub use access::AccessListener;
pub use anonymous::AnonymousAuthenticationListener;
pub use basic::{BasicAuthenticationListener, HttpBasicConfig};
pub use channel::{ChannelListener, PortMapper};
pub use context::{FirewallBuilder, FirewallConfig, FirewallContext, FirewallOutcome, FirewallResult};
pub use context_listener::ContextListener;
pub use exception::{ExceptionConfig, ExceptionListener, ExceptionOutcome};
pub use form_login::{FormLoginConfig, UsernamePasswordFormAuthenticationListener};
pub use json_login::{JsonLoginConfig, UsernamePasswordJsonAuthenticationListener};
pub use logout::{
    CookieClearingLogoutHandler, CsrfTokenClearingLogoutHandler, DefaultLogoutSuccessHandler,
    LogoutConfig, LogoutHandler, LogoutListener, LogoutSuccessHandler, SessionLogoutHandler,
};
pub use map::{FirewallMap, FirewallMapBuilder};
pub use pre_auth::{PreAuthenticatedListener, PreAuthenticatedSource};
pub use remember_me::RememberMeListener;
pub use switch_user::{SwitchUserConfig, SwitchUserListener};

/// Usernames longer than this are rejected before any user lookup.
pub const MAX_USERNAME_LENGTH: usize = 4096;

/// Answer of [`FirewallListener::supports`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supports {
    Yes,
    No,
    /// The listener only needs to run once the token is used. The pipeline
    /// runs it right away.
    Lazy,
}

impl From<bool> for Supports {
    fn from(value: bool) -> Self {
        if value {
            Supports::Yes
        } else {
            Supports::No
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Channel,
    Context,
    PreAuthenticated,
    Form,
    Json,
    HttpBasic,
    RememberMe,
    Anonymous,
    SwitchUser,
    Logout,
    Access,
    Custom,
}

/// One concern of the firewall: authentication, access control, channel
/// enforcement, ...
///
/// `authenticate` only runs when `supports` did not answer [`Supports::No`].
/// A listener ends the chain by setting a response on the event and aborts it
/// by returning an error.
pub trait FirewallListener: Send + Sync {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Custom
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports;

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError>;
}

/// Rejects usernames over [`MAX_USERNAME_LENGTH`].
pub fn check_username(username: &str) -> Result<(), AuthenticationError> {
    if username.len() > MAX_USERNAME_LENGTH {
        log::debug!("Rejecting username of {} bytes", username.len());
        return Err(AuthenticationError::BadCredentials);
    }
    Ok(())
}

/// Shared by the listeners that log users in.
///
/// Runs the authentication manager, and on success applies the session
/// strategy, stores the token, announces the login and lets remember-me
/// services issue their cookie.
#[derive(Clone)]
pub struct LoginService {
    provider_key: String,
    manager: Arc<dyn AuthenticationManager>,
    session: SessionConfig,
    stateless: bool,
    dispatcher: EventDispatcher,
    remember_me: Option<Arc<dyn RememberMeServices>>,
}

impl LoginService {
    pub fn new(provider_key: &str, manager: Arc<dyn AuthenticationManager>) -> Self {
        LoginService {
            provider_key: provider_key.to_string(),
            manager,
            session: SessionConfig::default(),
            stateless: false,
            dispatcher: EventDispatcher::default(),
            remember_me: None,
        }
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn stateless(mut self, stateless: bool) -> Self {
        self.stateless = stateless;
        self
    }

    pub fn dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn remember_me(mut self, services: Option<Arc<dyn RememberMeServices>>) -> Self {
        self.remember_me = services;
        self
    }

    pub fn get_provider_key(&self) -> &str {
        &self.provider_key
    }

    pub fn get_session_config(&self) -> &SessionConfig {
        &self.session
    }

    pub fn is_stateless(&self) -> bool {
        self.stateless
    }

    pub fn manager(&self) -> &Arc<dyn AuthenticationManager> {
        &self.manager
    }

    pub fn get_dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn authenticate(&self, token: Token) -> Result<Token, AuthenticationError> {
        self.manager.authenticate(token)
    }

    /// Finishes a successful login.
    pub fn login(&self, event: &mut RequestEvent, token: Token) {
        log::info!(
            "User \"{}\" authenticated on firewall \"{}\"",
            token.get_username(),
            self.provider_key
        );
        if !self.stateless && event.has_session(self.session.get_cookie_name()) {
            self.session
                .get_strategy()
                .on_authentication(&event.session());
        }
        self.dispatcher.dispatch(SecurityEvent::InteractiveLogin {
            username: token.get_username().to_string(),
            firewall: self.provider_key.clone(),
        });
        if let Some(services) = &self.remember_me {
            services.login_success(event, &token);
        }
        event.set_token(Some(token));
    }

    /// Records a failed login and tells remember-me services about it.
    pub fn fail(&self, event: &mut RequestEvent, username: Option<&str>, error: &AuthenticationError) {
        log::info!("Authentication request failed: {}", error);
        self.dispatcher.dispatch(SecurityEvent::AuthenticationFailure {
            username: username.map(str::to_string),
            firewall: self.provider_key.clone(),
            reason: error.to_string(),
        });
        if let Some(services) = &self.remember_me {
            services.login_fail(event);
        }
    }

    /// Drops the stored token when it belongs to this firewall.
    pub fn clear_token(&self, event: &mut RequestEvent) {
        if event
            .token()
            .map(|t| t.get_provider_key() == self.provider_key)
            .unwrap_or(false)
        {
            log::debug!("Clearing token of firewall \"{}\"", self.provider_key);
            event.set_token(None);
        }
    }

    /// Whether the stored token is already an authenticated token of this
    /// firewall for `username`.
    pub fn is_already_authenticated(&self, event: &RequestEvent, username: &str) -> bool {
        event
            .token()
            .map(|t| {
                t.is_authenticated()
                    && t.get_provider_key() == self.provider_key
                    && t.get_username() == username
                    && (t.is_kind_username_password() || t.is_kind_pre_authenticated())
            })
            .unwrap_or(false)
    }
}
