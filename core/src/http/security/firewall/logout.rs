//! Logout: path match, optional CSRF check, cleanup handlers, redirect.
//!
//! # Example
//! ```rust,ignore
//! use actix_firewall_core::http::security::firewall::LogoutConfig;
//!
//! let logout = LogoutConfig::new()
//!     .path("/logout")
//!     .target("/login?logout")
//!     .delete_cookie("theme", "/", None);
//! ```

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;

use crate::http::error::{FirewallError, LogoutError};
use crate::http::security::csrf::CsrfTokenManager;
use crate::http::security::event::RequestEvent;
use crate::http::security::events::{EventDispatcher, SecurityEvent};
use crate::http::security::firewall::{FirewallListener, ListenerKind, Supports};
use crate::http::security::http_utils;
use crate::http::security::token::Token;

// =============================================================================
// Logout Handlers
// =============================================================================

/// Cleanup run when an authenticated user logs out.
pub trait LogoutHandler: Send + Sync {
    fn logout(&self, event: &mut RequestEvent, token: &Token);
}

/// Destroys the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionLogoutHandler;

impl LogoutHandler for SessionLogoutHandler {
    fn logout(&self, event: &mut RequestEvent, _token: &Token) {
        log::debug!("Invalidating session on logout");
        event.session().purge();
    }
}

/// Forgets every CSRF token of the session.
pub struct CsrfTokenClearingLogoutHandler {
    manager: Arc<dyn CsrfTokenManager>,
}

impl CsrfTokenClearingLogoutHandler {
    pub fn new(manager: Arc<dyn CsrfTokenManager>) -> Self {
        CsrfTokenClearingLogoutHandler { manager }
    }
}

impl LogoutHandler for CsrfTokenClearingLogoutHandler {
    fn logout(&self, event: &mut RequestEvent, _token: &Token) {
        self.manager.clear(event.request());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
}

/// Tells the client to drop the configured cookies.
#[derive(Debug, Clone, Default)]
pub struct CookieClearingLogoutHandler {
    cookies: Vec<CookieSpec>,
}

impl CookieClearingLogoutHandler {
    pub fn new(cookies: Vec<CookieSpec>) -> Self {
        CookieClearingLogoutHandler { cookies }
    }
}

impl LogoutHandler for CookieClearingLogoutHandler {
    fn logout(&self, event: &mut RequestEvent, _token: &Token) {
        for cookie in &self.cookies {
            event.remove_cookie(&cookie.name, &cookie.path, cookie.domain.as_deref());
        }
    }
}

// =============================================================================
// Success Handler
// =============================================================================

pub trait LogoutSuccessHandler: Send + Sync {
    fn on_logout_success(&self, event: &mut RequestEvent) -> HttpResponse;
}

/// Redirects to the target path (or route name).
#[derive(Debug, Clone)]
pub struct DefaultLogoutSuccessHandler {
    target: String,
}

impl DefaultLogoutSuccessHandler {
    pub fn new(target: &str) -> Self {
        DefaultLogoutSuccessHandler {
            target: target.to_string(),
        }
    }
}

impl LogoutSuccessHandler for DefaultLogoutSuccessHandler {
    fn on_logout_success(&self, event: &mut RequestEvent) -> HttpResponse {
        http_utils::create_redirect_response(event.request(), &self.target, StatusCode::FOUND)
    }
}

// =============================================================================
// Logout Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct LogoutConfig {
    path: String,
    target: String,
    csrf_parameter: String,
    csrf_token_id: String,
    enable_csrf: bool,
    invalidate_session: bool,
    delete_cookies: Vec<CookieSpec>,
}

impl Default for LogoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogoutConfig {
    pub fn new() -> Self {
        LogoutConfig {
            path: "/logout".to_string(),
            target: "/".to_string(),
            csrf_parameter: "_csrf_token".to_string(),
            csrf_token_id: "logout".to_string(),
            enable_csrf: false,
            invalidate_session: true,
            delete_cookies: Vec::new(),
        }
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn csrf_parameter(mut self, name: &str) -> Self {
        self.csrf_parameter = name.to_string();
        self
    }

    pub fn csrf_token_id(mut self, id: &str) -> Self {
        self.csrf_token_id = id.to_string();
        self
    }

    pub fn enable_csrf(mut self, enable: bool) -> Self {
        self.enable_csrf = enable;
        self
    }

    pub fn invalidate_session(mut self, invalidate: bool) -> Self {
        self.invalidate_session = invalidate;
        self
    }

    pub fn delete_cookie(mut self, name: &str, path: &str, domain: Option<&str>) -> Self {
        self.delete_cookies.push(CookieSpec {
            name: name.to_string(),
            path: path.to_string(),
            domain: domain.map(str::to_string),
        });
        self
    }

    pub fn get_path(&self) -> &str {
        &self.path
    }

    pub fn get_target(&self) -> &str {
        &self.target
    }

    pub fn is_csrf_enabled(&self) -> bool {
        self.enable_csrf
    }

    pub fn is_invalidate_session(&self) -> bool {
        self.invalidate_session
    }

    pub fn get_delete_cookies(&self) -> &[CookieSpec] {
        &self.delete_cookies
    }
}

// =============================================================================
// Logout Listener
// =============================================================================

/// Logs the user out when the logout path is requested.
///
/// The handlers only run when a token is present. The token storage is
/// emptied in every case.
pub struct LogoutListener {
    provider_key: String,
    config: LogoutConfig,
    csrf_token_manager: Option<Arc<dyn CsrfTokenManager>>,
    success_handler: Arc<dyn LogoutSuccessHandler>,
    handlers: Vec<Arc<dyn LogoutHandler>>,
    dispatcher: EventDispatcher,
}

impl LogoutListener {
    pub fn new(provider_key: &str, config: LogoutConfig) -> Self {
        let success_handler = Arc::new(DefaultLogoutSuccessHandler::new(&config.target));
        LogoutListener {
            provider_key: provider_key.to_string(),
            config,
            csrf_token_manager: None,
            success_handler,
            handlers: Vec::new(),
            dispatcher: EventDispatcher::default(),
        }
    }

    pub fn csrf_token_manager(mut self, manager: Option<Arc<dyn CsrfTokenManager>>) -> Self {
        self.csrf_token_manager = manager;
        self
    }

    pub fn success_handler(mut self, handler: Arc<dyn LogoutSuccessHandler>) -> Self {
        self.success_handler = handler;
        self
    }

    /// Handlers run in the order they are added.
    pub fn handler(mut self, handler: Arc<dyn LogoutHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn get_config(&self) -> &LogoutConfig {
        &self.config
    }

    fn check_csrf(&self, event: &RequestEvent) -> Result<(), LogoutError> {
        if !self.config.enable_csrf {
            return Ok(());
        }
        let value = event.parameter(&self.config.csrf_parameter);
        let valid = self
            .csrf_token_manager
            .as_ref()
            .map(|m| m.is_token_valid(event.request(), &self.config.csrf_token_id, value))
            .unwrap_or(false);
        if valid {
            Ok(())
        } else {
            Err(LogoutError::InvalidCsrfToken)
        }
    }
}

impl FirewallListener for LogoutListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Logout
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        Supports::from(http_utils::check_request_path(event.request(), &self.config.path))
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        self.check_csrf(event)?;

        let response = self.success_handler.on_logout_success(event);

        if let Some(token) = event.token().cloned() {
            log::info!("Logging out \"{}\"", token.get_username());
            for handler in &self.handlers {
                handler.logout(event, &token);
            }
            self.dispatcher.dispatch(SecurityEvent::Logout {
                username: token.get_username().to_string(),
                firewall: self.provider_key.clone(),
            });
        }

        event.set_token(None);
        event.set_response(response);
        Ok(())
    }
}
