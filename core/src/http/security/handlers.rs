//! Response builders plugged into the listeners: entry points, success and
//! failure handlers, access-denied handlers.

use actix_web::http::{header, StatusCode};
use actix_web::HttpResponse;
use regex::Regex;

use crate::http::error::{AccessDeniedError, AuthenticationError};
use crate::http::security::event::RequestEvent;
use crate::http::security::http_utils;
use crate::http::security::session::SessionConfig;
use crate::http::security::token::Token;

// =============================================================================
// Entry Points
// =============================================================================

/// Starts authentication for a request that needs it.
pub trait AuthenticationEntryPoint: Send + Sync {
    fn start(&self, event: &mut RequestEvent, error: &AuthenticationError) -> HttpResponse;
}

/// Redirects to the login page.
#[derive(Debug, Clone)]
pub struct FormAuthenticationEntryPoint {
    login_path: String,
}

impl FormAuthenticationEntryPoint {
    pub fn new(login_path: &str) -> Self {
        FormAuthenticationEntryPoint {
            login_path: login_path.to_string(),
        }
    }
}

impl AuthenticationEntryPoint for FormAuthenticationEntryPoint {
    fn start(&self, event: &mut RequestEvent, _error: &AuthenticationError) -> HttpResponse {
        http_utils::create_redirect_response(event.request(), &self.login_path, StatusCode::FOUND)
    }
}

/// Answers `401` with a `WWW-Authenticate: Basic realm="..."` challenge.
#[derive(Debug, Clone)]
pub struct BasicAuthenticationEntryPoint {
    realm: String,
}

impl BasicAuthenticationEntryPoint {
    pub fn new(realm: &str) -> Self {
        BasicAuthenticationEntryPoint {
            realm: realm.to_string(),
        }
    }

    pub fn www_authenticate_header(&self) -> String {
        format!("Basic realm=\"{}\"", self.realm)
    }
}

impl AuthenticationEntryPoint for BasicAuthenticationEntryPoint {
    fn start(&self, _event: &mut RequestEvent, error: &AuthenticationError) -> HttpResponse {
        HttpResponse::Unauthorized()
            .insert_header((header::WWW_AUTHENTICATE, self.www_authenticate_header()))
            .body(error.to_string())
    }
}

// =============================================================================
// Success Handlers
// =============================================================================

pub trait AuthenticationSuccessHandler: Send + Sync {
    fn on_authentication_success(&self, event: &mut RequestEvent, token: &Token) -> HttpResponse;
}

/// Where to send a user after a successful login.
#[derive(Debug, Clone)]
pub struct SuccessOptions {
    pub default_target_path: String,
    pub always_use_default_target_path: bool,
    pub target_path_parameter: String,
    pub use_referer: bool,
    pub login_path: String,
    pub redirect_status: StatusCode,
    /// Foreign hosts a target path or referer may point at.
    pub allowed_domains: Option<Regex>,
}

impl Default for SuccessOptions {
    fn default() -> Self {
        SuccessOptions {
            default_target_path: "/".to_string(),
            always_use_default_target_path: false,
            target_path_parameter: "_target_path".to_string(),
            use_referer: false,
            login_path: "/login".to_string(),
            redirect_status: StatusCode::MOVED_PERMANENTLY,
            allowed_domains: None,
        }
    }
}

/// Redirects to, in order: the default target when forced, the target path
/// parameter, the target path saved in the session, the referer (when
/// enabled and not the login page), the default target.
///
/// Targets from the request pointing at another host are skipped unless
/// allowed by [`SuccessOptions::allowed_domains`].
pub struct DefaultAuthenticationSuccessHandler {
    options: SuccessOptions,
    provider_key: String,
    session: SessionConfig,
}

impl DefaultAuthenticationSuccessHandler {
    pub fn new(options: SuccessOptions, provider_key: &str, session: SessionConfig) -> Self {
        DefaultAuthenticationSuccessHandler {
            options,
            provider_key: provider_key.to_string(),
            session,
        }
    }

    pub fn determine_target_url(&self, event: &RequestEvent) -> String {
        if self.options.always_use_default_target_path {
            return self.options.default_target_path.clone();
        }

        let req = event.request();
        let allowed = self.options.allowed_domains.as_ref();

        if let Some(target) = event
            .parameter(&self.options.target_path_parameter)
            .filter(|t| !t.is_empty())
        {
            if http_utils::is_safe_redirect(req, target, allowed) {
                return target.to_string();
            }
            log::warn!("Ignoring target path \"{}\" pointing at a foreign host", target);
        }

        if let Some(target) = self
            .session
            .take_target_path(&event.session(), &self.provider_key)
        {
            return target;
        }

        if self.options.use_referer {
            if let Some(referer) = event.header("Referer") {
                let referer = referer.split('?').next().unwrap_or_default();
                let login = http_utils::generate_uri(req, &self.options.login_path);
                if !referer.is_empty()
                    && http_utils::path_of(referer) != http_utils::path_of(&login)
                    && http_utils::is_safe_redirect(req, referer, allowed)
                {
                    return referer.to_string();
                }
            }
        }

        self.options.default_target_path.clone()
    }
}

impl AuthenticationSuccessHandler for DefaultAuthenticationSuccessHandler {
    fn on_authentication_success(&self, event: &mut RequestEvent, _token: &Token) -> HttpResponse {
        let target = self.determine_target_url(event);
        log::debug!("Redirecting to \"{}\" after login", target);
        http_utils::create_redirect_response(event.request(), &target, self.options.redirect_status)
    }
}

// =============================================================================
// Failure Handlers
// =============================================================================

pub trait AuthenticationFailureHandler: Send + Sync {
    fn on_authentication_failure(
        &self,
        event: &mut RequestEvent,
        error: &AuthenticationError,
    ) -> HttpResponse;
}

#[derive(Debug, Clone)]
pub struct FailureOptions {
    /// Defaults to the login path when unset.
    pub failure_path: Option<String>,
    pub failure_path_parameter: String,
    pub login_path: String,
    /// Foreign hosts the failure path parameter may point at.
    pub allowed_domains: Option<Regex>,
}

impl Default for FailureOptions {
    fn default() -> Self {
        FailureOptions {
            failure_path: None,
            failure_path_parameter: "_failure_path".to_string(),
            login_path: "/login".to_string(),
            allowed_domains: None,
        }
    }
}

/// Stores the error in the session and redirects to the failure path.
pub struct DefaultAuthenticationFailureHandler {
    options: FailureOptions,
    session: SessionConfig,
}

impl DefaultAuthenticationFailureHandler {
    pub fn new(options: FailureOptions, session: SessionConfig) -> Self {
        DefaultAuthenticationFailureHandler { options, session }
    }
}

impl AuthenticationFailureHandler for DefaultAuthenticationFailureHandler {
    fn on_authentication_failure(
        &self,
        event: &mut RequestEvent,
        error: &AuthenticationError,
    ) -> HttpResponse {
        let target = event
            .parameter(&self.options.failure_path_parameter)
            .filter(|t| {
                http_utils::is_safe_redirect(event.request(), t, self.options.allowed_domains.as_ref())
            })
            .map(str::to_string)
            .or_else(|| self.options.failure_path.clone())
            .unwrap_or_else(|| self.options.login_path.clone());

        self.session.set_last_error(&event.session(), error);
        log::debug!("Authentication failure, redirecting to \"{}\"", target);
        http_utils::create_redirect_response(event.request(), &target, StatusCode::FOUND)
    }
}

// =============================================================================
// Access Denied Handlers
// =============================================================================

/// Renders authorization failures of fully authenticated users. Returning
/// `None` leaves the failure to the next fallback.
pub trait AccessDeniedHandler: Send + Sync {
    fn handle(&self, event: &mut RequestEvent, error: &AccessDeniedError) -> Option<HttpResponse>;
}

impl<F> AccessDeniedHandler for F
where
    F: Fn(&mut RequestEvent, &AccessDeniedError) -> Option<HttpResponse> + Send + Sync,
{
    fn handle(&self, event: &mut RequestEvent, error: &AccessDeniedError) -> Option<HttpResponse> {
        self(event, error)
    }
}
