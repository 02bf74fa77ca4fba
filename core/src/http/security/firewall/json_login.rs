//! JSON login for API clients.

use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::HttpResponse;
use base64::prelude::*;
use regex::Regex;
use serde_json::{json, Value};

use crate::http::error::{AuthenticationError, FirewallError};
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::basic::decode_basic_credentials;
use crate::http::security::firewall::{check_username, FirewallListener, ListenerKind, LoginService, Supports};
use crate::http::security::handlers::{
    AuthenticationFailureHandler, AuthenticationSuccessHandler, DefaultAuthenticationSuccessHandler,
    SuccessOptions,
};
use crate::http::security::http_utils;
use crate::http::security::token::Token;

#[derive(Debug, Clone)]
pub struct JsonLoginConfig {
    check_path: String,
    /// Dotted path of the username in the body, e.g. `security.credentials.login`
    username_path: String,
    password_path: String,
    default_target_path: String,
    always_use_default_target_path: bool,
    target_path_parameter: String,
    success_redirect_status: StatusCode,
    failure_path: Option<String>,
    redirect_domains: Option<Regex>,
}

impl Default for JsonLoginConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonLoginConfig {
    pub fn new() -> Self {
        JsonLoginConfig {
            check_path: "/login_check".to_string(),
            username_path: "username".to_string(),
            password_path: "password".to_string(),
            default_target_path: "/".to_string(),
            always_use_default_target_path: false,
            target_path_parameter: "_target_path".to_string(),
            success_redirect_status: StatusCode::MOVED_PERMANENTLY,
            failure_path: None,
            redirect_domains: None,
        }
    }

    pub fn check_path(mut self, path: &str) -> Self {
        self.check_path = path.to_string();
        self
    }

    pub fn username_path(mut self, path: &str) -> Self {
        self.username_path = path.to_string();
        self
    }

    pub fn password_path(mut self, path: &str) -> Self {
        self.password_path = path.to_string();
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

    pub fn success_redirect_status(mut self, status: StatusCode) -> Self {
        self.success_redirect_status = status;
        self
    }

    /// Redirect failed attempts here instead of answering 401.
    pub fn failure_path(mut self, path: &str) -> Self {
        self.failure_path = Some(path.to_string());
        self
    }

    /// Foreign hosts `_target_path` may redirect to.
    pub fn allowed_redirect_domains(mut self, domains: Regex) -> Self {
        self.redirect_domains = Some(domains);
        self
    }

    pub fn get_check_path(&self) -> &str {
        &self.check_path
    }

    pub fn get_username_path(&self) -> &str {
        &self.username_path
    }

    pub fn get_password_path(&self) -> &str {
        &self.password_path
    }

    pub fn get_failure_path(&self) -> Option<&str> {
        self.failure_path.as_deref()
    }

    pub fn success_options(&self) -> SuccessOptions {
        SuccessOptions {
            default_target_path: self.default_target_path.clone(),
            always_use_default_target_path: self.always_use_default_target_path,
            target_path_parameter: self.target_path_parameter.clone(),
            use_referer: false,
            login_path: self.check_path.clone(),
            redirect_status: self.success_redirect_status,
            allowed_domains: self.redirect_domains.clone(),
        }
    }
}

/// Walks `path` (`a.b.c`) through nested JSON objects.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

/// Redirects to the failure path, or answers `401 {"error": "..."}`.
pub struct JsonAuthenticationFailureHandler {
    failure_path: Option<String>,
}

impl JsonAuthenticationFailureHandler {
    pub fn new(failure_path: Option<String>) -> Self {
        JsonAuthenticationFailureHandler { failure_path }
    }
}

impl AuthenticationFailureHandler for JsonAuthenticationFailureHandler {
    fn on_authentication_failure(
        &self,
        event: &mut RequestEvent,
        error: &AuthenticationError,
    ) -> HttpResponse {
        match &self.failure_path {
            Some(path) => http_utils::create_redirect_response(event.request(), path, StatusCode::FOUND),
            None => HttpResponse::Unauthorized().json(json!({ "error": error.to_string() })),
        }
    }
}

/// Authenticates credentials sent as JSON to the check path, or as a
/// base64 `username:password` in `Authorization: Basic` or `X-Auth-Token`.
pub struct UsernamePasswordJsonAuthenticationListener {
    login: LoginService,
    config: JsonLoginConfig,
    success_handler: Arc<dyn AuthenticationSuccessHandler>,
    failure_handler: Arc<dyn AuthenticationFailureHandler>,
}

impl UsernamePasswordJsonAuthenticationListener {
    pub fn new(login: LoginService, config: JsonLoginConfig) -> Self {
        let success_handler = Arc::new(DefaultAuthenticationSuccessHandler::new(
            config.success_options(),
            login.get_provider_key(),
            login.get_session_config().clone(),
        ));
        let failure_handler = Arc::new(JsonAuthenticationFailureHandler::new(
            config.failure_path.clone(),
        ));
        UsernamePasswordJsonAuthenticationListener {
            login,
            config,
            success_handler,
            failure_handler,
        }
    }

    pub fn success_handler(mut self, handler: Arc<dyn AuthenticationSuccessHandler>) -> Self {
        self.success_handler = handler;
        self
    }

    pub fn failure_handler(mut self, handler: Arc<dyn AuthenticationFailureHandler>) -> Self {
        self.failure_handler = handler;
        self
    }

    fn header_credentials(event: &RequestEvent) -> Option<(String, String)> {
        if let Some(value) = event.header(header::AUTHORIZATION.as_str()) {
            if let Some(credentials) = decode_basic_credentials(value) {
                return Some(credentials);
            }
        }
        let token = event.header("X-Auth-Token")?;
        let encoded = token.strip_prefix("Basic ").unwrap_or(token).trim();
        let decoded = String::from_utf8(BASE64_STANDARD.decode(encoded).ok()?).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some((username.to_string(), password.to_string()))
    }

    fn body_credentials(&self, event: &RequestEvent) -> Result<(String, String), AuthenticationError> {
        let body = event.body().json().ok_or(AuthenticationError::BadCredentials)?;
        let username = lookup(body, &self.config.username_path)
            .and_then(Value::as_str)
            .ok_or(AuthenticationError::BadCredentials)?;
        let password = lookup(body, &self.config.password_path)
            .and_then(Value::as_str)
            .ok_or(AuthenticationError::BadCredentials)?;
        Ok((username.to_string(), password.to_string()))
    }

    fn credentials(&self, event: &RequestEvent) -> Result<(String, String), AuthenticationError> {
        match Self::header_credentials(event) {
            Some(credentials) => Ok(credentials),
            None => self.body_credentials(event),
        }
    }
}

impl FirewallListener for UsernamePasswordJsonAuthenticationListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Json
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        if !http_utils::check_request_path(event.request(), &self.config.check_path) {
            return Supports::No;
        }
        Supports::from(event.body().json().is_some() || Self::header_credentials(event).is_some())
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        let mut attempted = None;
        let result = self.credentials(event).and_then(|(username, password)| {
            check_username(&username)?;
            attempted = Some(username.clone());
            self.login.authenticate(Token::username_password(
                &username,
                &password,
                self.login.get_provider_key(),
            ))
        });

        match result {
            Ok(token) => {
                self.login.login(event, token.clone());
                let response = self.success_handler.on_authentication_success(event, &token);
                event.set_response(response);
            }
            Err(error) => {
                self.login.clear_token(event);
                self.login.fail(event, attempted.as_deref(), &error);
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
    use crate::http::security::event::RequestBody;
    use crate::http::security::firewall::testing::{event, login_service};
    use actix_web::body::to_bytes;
    use actix_web::test::TestRequest;

    fn json_event(uri: &str, body: &str) -> RequestEvent {
        RequestEvent::new(
            TestRequest::post().uri(uri).to_http_request(),
            RequestBody::parse("application/json", body.as_bytes()),
        )
    }

    #[test]
    fn test_lookup_nested_path() {
        let value = json!({"security": {"credentials": {"login": "alice"}}});
        assert_eq!(
            lookup(&value, "security.credentials.login").and_then(Value::as_str),
            Some("alice")
        );
        assert!(lookup(&value, "security.missing").is_none());
    }

    #[test]
    fn test_json_body_login() {
        let listener = UsernamePasswordJsonAuthenticationListener::new(
            login_service(),
            JsonLoginConfig::new()
                .check_path("/api/login")
                .username_path("credentials.user")
                .password_path("credentials.pass"),
        );
        let mut event = json_event(
            "/api/login",
            r#"{"credentials": {"user": "alice", "pass": "secret"}}"#,
        );

        assert_eq!(listener.supports(&mut event), Supports::Yes);
        listener.authenticate(&mut event).unwrap();

        assert_eq!(event.token().unwrap().get_username(), "alice");
        assert_eq!(event.response().unwrap().status(), StatusCode::MOVED_PERMANENTLY);
    }

    #[test]
    fn test_x_auth_token_header() {
        let listener = UsernamePasswordJsonAuthenticationListener::new(login_service(), JsonLoginConfig::new());
        let mut event = event(
            TestRequest::post()
                .uri("/login_check")
                .insert_header(("X-Auth-Token", BASE64_STANDARD.encode("alice:secret"))),
        );

        assert_eq!(listener.supports(&mut event), Supports::Yes);
        listener.authenticate(&mut event).unwrap();
        assert_eq!(event.token().unwrap().get_username(), "alice");
    }

    #[actix_rt::test]
    async fn test_failure_without_path_answers_json_401() {
        let listener = UsernamePasswordJsonAuthenticationListener::new(login_service(), JsonLoginConfig::new());
        let mut event = json_event("/login_check", r#"{"username": "alice", "password": "bad"}"#);

        listener.authenticate(&mut event).unwrap();

        let res = event.take_response().unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(res.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Invalid credentials.");
    }

    #[test]
    fn test_failure_with_path_redirects() {
        let listener = UsernamePasswordJsonAuthenticationListener::new(
            login_service(),
            JsonLoginConfig::new().failure_path("/login/failed"),
        );
        let mut event = json_event("/login_check", r#"{"username": "alice"}"#);

        listener.authenticate(&mut event).unwrap();

        let res = event.response().unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login/failed");
    }

    #[test]
    fn test_non_json_request_is_not_supported() {
        let listener = UsernamePasswordJsonAuthenticationListener::new(login_service(), JsonLoginConfig::new());
        let mut event = event(TestRequest::post().uri("/login_check"));
        assert_eq!(listener.supports(&mut event), Supports::No);
    }
}
