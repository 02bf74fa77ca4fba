//! Turns security errors into responses.

use std::error::Error as StdError;
use std::sync::Arc;

use actix_web::HttpResponse;

use crate::http::error::{
    AccessDeniedError, AuthenticationError, FirewallError, LazyResponseError, LogoutError,
};
use crate::http::security::event::RequestEvent;
use crate::http::security::events::{EventDispatcher, SecurityEvent};
use crate::http::security::handlers::{AccessDeniedHandler, AuthenticationEntryPoint};
use crate::http::security::http_utils;
use crate::http::security::session::SessionConfig;
use crate::http::security::token::AuthenticationTrustResolver;

#[derive(Debug, Clone, Default)]
pub struct ExceptionConfig {
    access_denied_url: Option<String>,
    stateless: bool,
}

impl ExceptionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page rendered, with a 403 status, for authenticated users that are
    /// denied access.
    pub fn access_denied_url(mut self, url: &str) -> Self {
        self.access_denied_url = Some(url.to_string());
        self
    }

    /// Stateless firewalls do not remember the target path.
    pub fn stateless(mut self, stateless: bool) -> Self {
        self.stateless = stateless;
        self
    }

    pub fn get_access_denied_url(&self) -> Option<&str> {
        self.access_denied_url.as_deref()
    }

    pub fn is_stateless(&self) -> bool {
        self.stateless
    }
}

/// What to do about an error.
#[derive(Debug)]
pub enum ExceptionOutcome {
    Respond(HttpResponse),
    /// Render this path internally, answering 403.
    Forward(String),
    /// Let actix render this error.
    Propagate(FirewallError),
    /// Nothing security related in the chain. The original error goes on.
    Unhandled,
}

/// Walks an error chain and answers the first security error found:
/// authentication errors start authentication, access denied either starts
/// authentication (token not fully authenticated) or goes to the access
/// denied handler/page, lazy responses are sent as is, logout errors are
/// logged.
pub struct ExceptionListener {
    provider_key: String,
    config: ExceptionConfig,
    session: SessionConfig,
    entry_point: Option<Arc<dyn AuthenticationEntryPoint>>,
    access_denied_handler: Option<Arc<dyn AccessDeniedHandler>>,
    trust_resolver: AuthenticationTrustResolver,
    dispatcher: EventDispatcher,
}

impl ExceptionListener {
    pub fn new(provider_key: &str, config: ExceptionConfig, session: SessionConfig) -> Self {
        ExceptionListener {
            provider_key: provider_key.to_string(),
            config,
            session,
            entry_point: None,
            access_denied_handler: None,
            trust_resolver: AuthenticationTrustResolver,
            dispatcher: EventDispatcher::default(),
        }
    }

    pub fn entry_point(mut self, entry_point: Option<Arc<dyn AuthenticationEntryPoint>>) -> Self {
        self.entry_point = entry_point;
        self
    }

    pub fn access_denied_handler(mut self, handler: Option<Arc<dyn AccessDeniedHandler>>) -> Self {
        self.access_denied_handler = handler;
        self
    }

    pub fn dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn has_entry_point(&self) -> bool {
        self.entry_point.is_some()
    }

    pub fn handle(&self, event: &mut RequestEvent, error: &(dyn StdError + 'static)) -> ExceptionOutcome {
        let mut current = Some(error);
        while let Some(error) = current {
            if let Some(e) = error.downcast_ref::<AuthenticationError>() {
                return self.handle_authentication_error(event, *e);
            }
            if let Some(e) = error.downcast_ref::<AccessDeniedError>() {
                return self.handle_access_denied(event, e);
            }
            if let Some(e) = error.downcast_ref::<LazyResponseError>() {
                return match e.take_response() {
                    Some(response) => ExceptionOutcome::Respond(response),
                    None => ExceptionOutcome::Unhandled,
                };
            }
            if let Some(e) = error.downcast_ref::<LogoutError>() {
                log::info!("A LogoutError was raised: {}", e);
                return ExceptionOutcome::Unhandled;
            }
            current = error.source();
        }
        ExceptionOutcome::Unhandled
    }

    fn handle_authentication_error(&self, event: &mut RequestEvent, error: AuthenticationError) -> ExceptionOutcome {
        log::info!("An AuthenticationError was raised: {}", error);
        self.start_authentication(event, error)
    }

    fn handle_access_denied(&self, event: &mut RequestEvent, error: &AccessDeniedError) -> ExceptionOutcome {
        let token = event.token();
        self.dispatcher.dispatch(SecurityEvent::AccessDenied {
            username: token.map(|t| t.get_username().to_string()),
            path: http_utils::request_uri(event.request()),
            firewall: self.provider_key.clone(),
        });

        if !self.trust_resolver.is_fully_authenticated(token) {
            log::debug!("Access denied, the user is not fully authenticated; redirecting to authentication entry point");
            return self.start_authentication(event, AuthenticationError::InsufficientAuthentication);
        }

        log::debug!("Access denied, the user is neither anonymous, nor remember-me");

        if let Some(handler) = &self.access_denied_handler {
            return match handler.handle(event, error) {
                Some(response) => ExceptionOutcome::Respond(response),
                None => ExceptionOutcome::Propagate(error.clone().into()),
            };
        }

        if let Some(url) = &self.config.access_denied_url {
            return ExceptionOutcome::Forward(url.clone());
        }

        ExceptionOutcome::Propagate(error.clone().into())
    }

    fn start_authentication(&self, event: &mut RequestEvent, error: AuthenticationError) -> ExceptionOutcome {
        if error.is_account_status() {
            event.set_token(None);
        }

        let Some(entry_point) = &self.entry_point else {
            log::debug!("No authentication entry point configured");
            return ExceptionOutcome::Propagate(error.into());
        };

        log::debug!("Calling Authentication entry point");

        if !self.config.stateless {
            self.save_target_path(event);
        }

        ExceptionOutcome::Respond(entry_point.start(event, &error))
    }

    fn save_target_path(&self, event: &RequestEvent) {
        let req = event.request();
        if http_utils::is_method_safe(req) && !http_utils::is_xml_http_request(req) {
            self.session.save_target_path(
                &event.session(),
                &self.provider_key,
                &http_utils::request_uri(req),
            );
        }
    }
}
