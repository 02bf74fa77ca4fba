//! Common test utilities and configuration.
//!
//! This module provides shared test infrastructure including:
//! - Test users and firewall configurations
//! - Test app builders
//! - A small cookie jar to carry the session between requests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{get, test, App, HttpMessage, HttpRequest, HttpResponse, Responder};
use base64::prelude::*;

use actix_firewall::http::error::{AccessDeniedError, AuthenticationError};
use actix_firewall::http::security::firewall::{
    FirewallBuilder, FormLoginConfig, HttpBasicConfig, JsonLoginConfig, LogoutConfig,
    SwitchUserConfig,
};
use actix_firewall::http::security::{
    AccessMap, AuthenticatedUser, Channel, CsrfTokenManager, CurrentToken, Firewall,
    FirewallContext, FirewallMap, InMemoryUserProvider, RememberMeConfig, RequestMatcher,
    ServerParams, SessionCsrfTokenManager, User, UserProvider,
};

// =============================================================================
// Test Configuration
// =============================================================================

/// Users:
/// - admin/admin: ADMIN, USER, ALLOWED_TO_SWITCH roles
/// - user/user: USER role
/// - guest/guest: GUEST role
pub fn test_users() -> InMemoryUserProvider {
    InMemoryUserProvider::new()
        .with_user(
            User::new("admin".into(), "{noop}admin".into())
                .roles(&["ADMIN".into(), "USER".into(), "ALLOWED_TO_SWITCH".into()]),
        )
        .with_user(User::new("user".into(), "{noop}user".into()).roles(&["USER".into()]))
        .with_user(User::new("guest".into(), "{noop}guest".into()).roles(&["GUEST".into()]))
}

/// Counts user lookups.
pub struct CountingProvider {
    inner: InMemoryUserProvider,
    calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            inner: test_users(),
            calls: Arc::clone(&calls),
        };
        (provider, calls)
    }
}

impl UserProvider for CountingProvider {
    fn load_user_by_username(&self, username: &str) -> Result<User, AuthenticationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load_user_by_username(username)
    }
}

pub fn path(pattern: &str) -> RequestMatcher {
    RequestMatcher::builder().path(pattern).build().unwrap()
}

/// Stateless `/api` firewall with HTTP Basic and JSON login, requiring ROLE_USER.
pub fn api_firewall() -> FirewallBuilder {
    FirewallContext::builder("api")
        .request_matcher(path("^/api"))
        .stateless(true)
        .http_basic(HttpBasicConfig::new().realm("API"))
        .json_login(JsonLoginConfig::new().check_path("/api/login"))
        .access_map(AccessMap::new().add(path("^/api"), &["ROLE_USER"], None))
}

/// Stateful catch-all firewall with form login, remember-me, switch user and logout.
pub fn main_firewall() -> FirewallBuilder {
    FirewallContext::builder("main")
        .form_login(FormLoginConfig::new())
        .remember_me(RememberMeConfig::new("test-secret").cookie_secure(false))
        .anonymous()
        .switch_user(SwitchUserConfig::new())
        .logout(LogoutConfig::new().delete_cookie("REMEMBERME", "/", None))
        .access_denied_url("/access-denied")
        .access_map(main_access_map())
}

pub fn main_access_map() -> AccessMap {
    AccessMap::new()
        .add(
            path("^/(login|access-denied|csrf|deny|profile)"),
            &["IS_AUTHENTICATED_ANONYMOUSLY"],
            None,
        )
        .add(path("^/secure"), &["IS_AUTHENTICATED_ANONYMOUSLY"], Some(Channel::Https))
        .add(path("^/admin"), &["ROLE_ADMIN"], None)
        .add(path("^/"), &["IS_AUTHENTICATED_REMEMBERED"], None)
}

pub fn firewall_map(firewalls: Vec<FirewallBuilder>) -> FirewallMap {
    firewalls
        .into_iter()
        .fold(
            FirewallMap::builder().user_provider("memory", Arc::new(test_users())),
            |builder, firewall| builder.firewall(firewall),
        )
        .build()
        .unwrap()
}

pub fn default_map() -> FirewallMap {
    firewall_map(vec![api_firewall(), main_firewall()])
}

/// Helper function to create Basic Auth header value.
pub fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!("Basic {}", BASE64_STANDARD.encode(credentials))
}

pub fn login_request(username: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/login_check")
        .set_form([("_username", username), ("_password", password)])
}

// =============================================================================
// Cookie Jar
// =============================================================================

/// Keeps the cookies set by responses, like a browser would.
#[derive(Default)]
pub struct Jar {
    cookies: HashMap<String, Cookie<'static>>,
}

impl Jar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<B>(&mut self, resp: &ServiceResponse<B>) {
        for cookie in resp.response().cookies() {
            let cookie = cookie.into_owned();
            if cookie.value().is_empty() {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies.insert(cookie.name().to_string(), cookie);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.get(name)
    }

    pub fn remove(&mut self, name: &str) {
        self.cookies.remove(name);
    }

    pub fn apply(&self, mut req: test::TestRequest) -> test::TestRequest {
        for cookie in self.cookies.values() {
            req = req.cookie(Cookie::new(cookie.name().to_string(), cookie.value().to_string()));
        }
        req
    }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn set_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.into_owned())
}

// =============================================================================
// Test Handlers
// =============================================================================

#[get("/")]
pub async fn index(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!("Welcome, {}!", user.get_username()))
}

#[get("/login")]
pub async fn login() -> impl Responder {
    HttpResponse::Ok().body("Login page")
}

#[get("/access-denied")]
pub async fn access_denied() -> impl Responder {
    HttpResponse::Ok().body("Access denied page")
}

#[get("/profile")]
pub async fn profile(token: CurrentToken) -> impl Responder {
    match token.as_ref() {
        Some(t) => HttpResponse::Ok().body(format!("Profile: {}", t.get_username())),
        None => HttpResponse::Ok().body("Profile: nobody"),
    }
}

#[get("/admin/dashboard")]
pub async fn admin_dashboard(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!("Admin: {}", user.get_username()))
}

#[get("/whoami")]
pub async fn whoami(token: CurrentToken) -> impl Responder {
    let Some(token) = token.into_inner() else {
        return HttpResponse::Ok().body("nobody");
    };
    match token.original_token() {
        Some(original) => HttpResponse::Ok().body(format!(
            "{} (impersonated by {})",
            token.get_username(),
            original.get_username()
        )),
        None => HttpResponse::Ok().body(token.get_username().to_string()),
    }
}

#[get("/api/users")]
pub async fn api_users(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!("API User: {}", user.get_username()))
}

#[get("/secure")]
pub async fn secure() -> impl Responder {
    HttpResponse::Ok().body("Secure page")
}

/// Denies access from inside the application.
#[get("/deny")]
pub async fn deny() -> Result<HttpResponse, AccessDeniedError> {
    Err(AccessDeniedError::default())
}

#[get("/csrf/{token_id}")]
pub async fn csrf(req: HttpRequest) -> impl Responder {
    let token_id = req.match_info().get("token_id").unwrap_or("authenticate").to_string();
    let token = SessionCsrfTokenManager::new().get_token(&req, &token_id);
    HttpResponse::Ok().body(token.value().to_string())
}

// =============================================================================
// Test Apps
// =============================================================================

fn session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::from(&[7u8; 64]))
        .cookie_secure(false)
        .build()
}

pub async fn create_app(
    map: FirewallMap,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .wrap(Firewall::new(map))
            .wrap(session_middleware())
            .service(index)
            .service(login)
            .service(access_denied)
            .service(profile)
            .service(admin_dashboard)
            .service(whoami)
            .service(api_users)
            .service(secure)
            .service(deny)
            .service(csrf),
    )
    .await
}

pub async fn create_test_app() -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    create_app(default_map()).await
}

/// App whose requests carry `params`, as set by a TLS terminator or a proxy.
pub async fn create_app_with_server_params(
    map: FirewallMap,
    params: ServerParams,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .wrap(Firewall::new(map))
            .wrap_fn(move |req, srv| {
                req.extensions_mut().insert(params.clone());
                srv.call(req)
            })
            .service(whoami)
            .service(index),
    )
    .await
}
