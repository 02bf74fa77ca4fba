//! Form-based login.
//!
//! # Example
//! ```rust,ignore
//! use actix_firewall_core::http::security::firewall::FormLoginConfig;
//!
//! let form_login = FormLoginConfig::new()
//!     .login_path("/login")
//!     .check_path("/login_check")
//!     .default_target_path("/dashboard")
//!     .enable_csrf(true);
//! ```

use std::sync::Arc;

use actix_web::http::{Method, StatusCode};
use regex::Regex;

use crate::http::error::{AuthenticationError, FirewallError};
use crate::http::security::csrf::CsrfTokenManager;
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::{check_username, FirewallListener, ListenerKind, LoginService, Supports};
use crate::http::security::handlers::{
    AuthenticationFailureHandler, AuthenticationSuccessHandler, DefaultAuthenticationFailureHandler,
    DefaultAuthenticationSuccessHandler, FailureOptions, FormAuthenticationEntryPoint, SuccessOptions,
};
use crate::http::security::http_utils;
use crate::http::security::token::Token;

// =============================================================================
// Form Login Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct FormLoginConfig {
    /// Path (or route name) the login form posts to
    check_path: String,
    /// Login page, used by the entry point and as the default failure path
    login_path: String,
    username_parameter: String,
    password_parameter: String,
    csrf_parameter: String,
    csrf_token_id: String,
    enable_csrf: bool,
    post_only: bool,
    require_previous_session: bool,
    default_target_path: String,
    always_use_default_target_path: bool,
    target_path_parameter: String,
    use_referer: bool,
    success_redirect_status: StatusCode,
    failure_path: Option<String>,
    failure_path_parameter: String,
    redirect_domains: Option<Regex>,
}

impl Default for FormLoginConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FormLoginConfig {
    pub fn new() -> Self {
        FormLoginConfig {
            check_path: "/login_check".to_string(),
            login_path: "/login".to_string(),
            username_parameter: "_username".to_string(),
            password_parameter: "_password".to_string(),
            csrf_parameter: "_csrf_token".to_string(),
            csrf_token_id: "authenticate".to_string(),
            enable_csrf: false,
            post_only: true,
            require_previous_session: false,
            default_target_path: "/".to_string(),
            always_use_default_target_path: false,
            target_path_parameter: "_target_path".to_string(),
            use_referer: false,
            success_redirect_status: StatusCode::MOVED_PERMANENTLY,
            failure_path: None,
            failure_path_parameter: "_failure_path".to_string(),
            redirect_domains: None,
        }
    }

    pub fn check_path(mut self, path: &str) -> Self {
        self.check_path = path.to_string();
        self
    }

    pub fn login_path(mut self, path: &str) -> Self {
        self.login_path = path.to_string();
        self
    }

    pub fn username_parameter(mut self, name: &str) -> Self {
        self.username_parameter = name.to_string();
        self
    }

    pub fn password_parameter(mut self, name: &str) -> Self {
        self.password_parameter = name.to_string();
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

    /// Requires a valid CSRF token with every login attempt.
    ///
    /// Needs a CSRF token manager on the firewall.
    pub fn enable_csrf(mut self, enable: bool) -> Self {
        self.enable_csrf = enable;
        self
    }

    pub fn post_only(mut self, post_only: bool) -> Self {
        self.post_only = post_only;
        self
    }

    /// Rejects attempts from clients that never received a session.
    pub fn require_previous_session(mut self, require: bool) -> Self {
        self.require_previous_session = require;
        self
    }

    pub fn default_target_path(mut self, path: &str) -> Self {
        self.default_target_path = path.to_string();
        self
    }

    pub fn always_use_default_target_path(mut self, always: bool) -> Self {
        self.always_use_default_target_path = always;
        self
    }

    pub fn target_path_parameter(mut self, name: &str) -> Self {
        self.target_path_parameter = name.to_string();
        self
    }

    pub fn use_referer(mut self, use_referer: bool) -> Self {
        self.use_referer = use_referer;
        self
    }

    /// Status of the redirect sent after a successful login (default: 301).
    pub fn success_redirect_status(mut self, status: StatusCode) -> Self {
        self.success_redirect_status = status;
        self
    }

    pub fn failure_path(mut self, path: &str) -> Self {
        self.failure_path = Some(path.to_string());
        self
    }

    pub fn failure_path_parameter(mut self, name: &str) -> Self {
        self.failure_path_parameter = name.to_string();
        self
    }

    /// Foreign hosts `_target_path`, `_failure_path` and the referer may
    /// redirect to. The request host is always allowed.
    pub fn allowed_redirect_domains(mut self, domains: Regex) -> Self {
        self.redirect_domains = Some(domains);
        self
    }

    // Getters

    pub fn get_check_path(&self) -> &str {
        &self.check_path
    }

    pub fn get_login_path(&self) -> &str {
        &self.login_path
    }

    pub fn get_username_parameter(&self) -> &str {
        &self.username_parameter
    }

    pub fn get_password_parameter(&self) -> &str {
        &self.password_parameter
    }

    pub fn get_csrf_parameter(&self) -> &str {
        &self.csrf_parameter
    }

    pub fn get_csrf_token_id(&self) -> &str {
        &self.csrf_token_id
    }

    pub fn is_csrf_enabled(&self) -> bool {
        self.enable_csrf
    }

    pub fn is_post_only(&self) -> bool {
        self.post_only
    }

    pub fn success_options(&self) -> SuccessOptions {
        SuccessOptions {
            default_target_path: self.default_target_path.clone(),
            always_use_default_target_path: self.always_use_default_target_path,
            target_path_parameter: self.target_path_parameter.clone(),
            use_referer: self.use_referer,
            login_path: self.login_path.clone(),
            redirect_status: self.success_redirect_status,
            allowed_domains: self.redirect_domains.clone(),
        }
    }

    pub fn failure_options(&self) -> FailureOptions {
        FailureOptions {
            failure_path: self.failure_path.clone(),
            failure_path_parameter: self.failure_path_parameter.clone(),
            login_path: self.login_path.clone(),
            allowed_domains: self.redirect_domains.clone(),
        }
    }

    pub fn entry_point(&self) -> FormAuthenticationEntryPoint {
        FormAuthenticationEntryPoint::new(&self.login_path)
    }
}

// =============================================================================
// Form Login Listener
// =============================================================================

/// Authenticates the username and password posted to the check path.
///
/// Success and failure both answer through their handler, a redirect by
/// default.
pub struct UsernamePasswordFormAuthenticationListener {
    login: LoginService,
    config: FormLoginConfig,
    csrf_token_manager: Option<Arc<dyn CsrfTokenManager>>,
    success_handler: Arc<dyn AuthenticationSuccessHandler>,
    failure_handler: Arc<dyn AuthenticationFailureHandler>,
}

impl UsernamePasswordFormAuthenticationListener {
    pub fn new(login: LoginService, config: FormLoginConfig) -> Self {
        let success_handler = Arc::new(DefaultAuthenticationSuccessHandler::new(
            config.success_options(),
            login.get_provider_key(),
            login.get_session_config().clone(),
        ));
        let failure_handler = Arc::new(DefaultAuthenticationFailureHandler::new(
            config.failure_options(),
            login.get_session_config().clone(),
        ));
        UsernamePasswordFormAuthenticationListener {
            login,
            config,
            csrf_token_manager: None,
            success_handler,
            failure_handler,
        }
    }

    pub fn csrf_token_manager(mut self, manager: Option<Arc<dyn CsrfTokenManager>>) -> Self {
        self.csrf_token_manager = manager;
        self
    }

    pub fn success_handler(mut self, handler: Arc<dyn AuthenticationSuccessHandler>) -> Self {
        self.success_handler = handler;
        self
    }

    pub fn failure_handler(mut self, handler: Arc<dyn AuthenticationFailureHandler>) -> Self {
        self.failure_handler = handler;
        self
    }

    fn attempt(&self, event: &RequestEvent) -> Result<Token, AuthenticationError> {
        if self.config.require_previous_session
            && !event.has_session(self.login.get_session_config().get_cookie_name())
        {
            return Err(AuthenticationError::SessionUnavailable);
        }

        if self.config.enable_csrf {
            let value = event.parameter(&self.config.csrf_parameter);
            let valid = match &self.csrf_token_manager {
                Some(manager) => {
                    manager.is_token_valid(event.request(), &self.config.csrf_token_id, value)
                }
                None => {
                    log::warn!("CSRF protection enabled without a token manager");
                    false
                }
            };
            if !valid {
                return Err(AuthenticationError::InvalidCsrfToken);
            }
        }

        let username = event
            .parameter(&self.config.username_parameter)
            .unwrap_or_default()
            .trim()
            .to_string();
        let password = event
            .parameter(&self.config.password_parameter)
            .unwrap_or_default()
            .to_string();

        check_username(&username)?;

        if !self.login.is_stateless() {
            self.login
                .get_session_config()
                .set_last_username(&event.session(), &username);
        }

        self.login.authenticate(Token::username_password(
            &username,
            &password,
            self.login.get_provider_key(),
        ))
    }
}

impl FirewallListener for UsernamePasswordFormAuthenticationListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Form
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        let req = event.request();
        if self.config.post_only && req.method() != Method::POST {
            return Supports::No;
        }
        Supports::from(http_utils::check_request_path(req, &self.config.check_path))
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        match self.attempt(event) {
            Ok(token) => {
                self.login.login(event, token.clone());
                if !self.login.is_stateless() {
                    self.login
                        .get_session_config()
                        .remove_last_error(&event.session());
                }
                let response = self.success_handler.on_authentication_success(event, &token);
                event.set_response(response);
            }
            Err(error) => {
                let username = event
                    .parameter(&self.config.username_parameter)
                    .map(str::to_string);
                self.login.clear_token(event);
                self.login.fail(event, username.as_deref(), &error);
                let response = self.failure_handler.on_authentication_failure(event, &error);
                event.set_response(response);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::security::csrf::SessionCsrfTokenManager;
    use crate::http::security::event::RequestBody;
    use crate::http::security::firewall::testing::{event, form_event, login_service};
    use crate::http::security::session::SessionConfig;
    use actix_web::http::header;
    use actix_web::test::TestRequest;

    fn location(event: &RequestEvent) -> String {
        event
            .response()
            .unwrap()
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    fn listener(config: FormLoginConfig) -> UsernamePasswordFormAuthenticationListener {
        UsernamePasswordFormAuthenticationListener::new(login_service().stateless(false), config)
    }

    #[test]
    fn test_supports_only_post_on_check_path() {
        let listener = listener(FormLoginConfig::new());
        assert_eq!(
            listener.supports(&mut event(TestRequest::post().uri("/login_check"))),
            Supports::Yes
        );
        assert_eq!(
            listener.supports(&mut event(TestRequest::get().uri("/login_check"))),
            Supports::No
        );
        assert_eq!(
            listener.supports(&mut event(TestRequest::post().uri("/other"))),
            Supports::No
        );
    }

    #[test]
    fn test_successful_login_redirects() {
        let listener = listener(FormLoginConfig::new().default_target_path("/home"));
        let mut event = form_event(
            TestRequest::post().uri("/login_check"),
            "_username=alice&_password=secret",
        );

        listener.authenticate(&mut event).unwrap();

        assert_eq!(event.token().unwrap().get_username(), "alice");
        assert_eq!(event.response().unwrap().status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&event), "/home");
        assert_eq!(
            SessionConfig::new().get_last_username(&event.session()).as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_failed_login_redirects_to_failure_path() {
        let listener = listener(FormLoginConfig::new().failure_path("/login?error=1"));
        let mut event = form_event(
            TestRequest::post().uri("/login_check"),
            "_username=alice&_password=nope",
        );

        listener.authenticate(&mut event).unwrap();

        assert!(event.token().is_none());
        assert_eq!(event.response().unwrap().status(), StatusCode::FOUND);
        assert_eq!(location(&event), "/login?error=1");
    }

    #[test]
    fn test_csrf_gate_rejects_valid_credentials() {
        let manager: Arc<dyn CsrfTokenManager> = Arc::new(SessionCsrfTokenManager::new());
        let listener = listener(FormLoginConfig::new().enable_csrf(true))
            .csrf_token_manager(Some(Arc::clone(&manager)));
        let req = TestRequest::post().uri("/login_check").to_http_request();
        manager.get_token(&req, "authenticate");
        let mut event = RequestEvent::new(
            req,
            RequestBody::parse(
                "application/x-www-form-urlencoded",
                b"_username=alice&_password=secret&_csrf_token=forged",
            ),
        );

        listener.authenticate(&mut event).unwrap();

        assert!(event.token().is_none());
        assert_eq!(
            SessionConfig::new().get_last_error(&event.session()).as_deref(),
            Some("invalid_csrf_token")
        );
    }

    #[test]
    fn test_csrf_gate_accepts_issued_token() {
        let manager: Arc<dyn CsrfTokenManager> = Arc::new(SessionCsrfTokenManager::new());
        let listener = listener(FormLoginConfig::new().enable_csrf(true))
            .csrf_token_manager(Some(Arc::clone(&manager)));
        let req = TestRequest::post().uri("/login_check").to_http_request();
        let issued = manager.get_token(&req, "authenticate");
        let body = format!("_username=alice&_password=secret&_csrf_token={}", issued.value());
        let mut event = RequestEvent::new(
            req,
            RequestBody::parse("application/x-www-form-urlencoded", body.as_bytes()),
        );

        listener.authenticate(&mut event).unwrap();
        assert_eq!(event.token().unwrap().get_username(), "alice");
    }

    #[test]
    fn test_missing_session_is_rejected() {
        let listener = listener(FormLoginConfig::new().require_previous_session(true));
        let mut event = form_event(
            TestRequest::post().uri("/login_check"),
            "_username=alice&_password=secret",
        );

        listener.authenticate(&mut event).unwrap();
        assert!(event.token().is_none());
    }

    #[test]
    fn test_overlong_username_is_rejected() {
        let listener = listener(FormLoginConfig::new());
        let body = format!("_username={}&_password=secret", "a".repeat(4097));
        let mut event = form_event(TestRequest::post().uri("/login_check"), &body);

        listener.authenticate(&mut event).unwrap();
        assert!(event.token().is_none());
        assert_eq!(
            SessionConfig::new().get_last_error(&event.session()).as_deref(),
            Some("bad_credentials")
        );
    }
}
