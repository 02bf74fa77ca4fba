//! Actix Firewall Demo Application
//!
//! Two firewalls: a stateless `api` firewall for `/api` and a stateful
//! `main` firewall with form login, remember-me, user switching and logout.

mod handlers;

use std::sync::Arc;

use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::{App, HttpServer};

use actix_firewall::http::error::ConfigError;
use actix_firewall::http::security::firewall::{
    FormLoginConfig, HttpBasicConfig, JsonLoginConfig, LogoutConfig, SwitchUserConfig,
};
use actix_firewall::http::security::{
    AccessMap, DelegatingPasswordEncoder, EventDispatcher, Firewall, FirewallContext, FirewallMap,
    InMemoryUserProvider, PasswordEncoder, PasswordEncoderError, RememberMeConfig, RequestMatcher,
    SecurityEvent, User,
};

/// Test users, hashed with Argon2.
fn users() -> Result<InMemoryUserProvider, PasswordEncoderError> {
    let encoder = DelegatingPasswordEncoder::new();

    Ok(InMemoryUserProvider::new()
        .with_user(
            User::with_encoded_password("admin", encoder.encode("admin")?)
                .roles(&["ADMIN".into(), "USER".into(), "ALLOWED_TO_SWITCH".into()])
                .authorities(&["users:read".into(), "users:write".into()]),
        )
        .with_user(
            User::with_encoded_password("user", encoder.encode("user")?)
                .roles(&["USER".into()])
                .authorities(&["users:read".into()]),
        )
        .with_user(User::with_encoded_password("guest", encoder.encode("guest")?).roles(&["GUEST".into()])))
}

fn path(pattern: &str) -> Result<RequestMatcher, ConfigError> {
    RequestMatcher::builder().path(pattern).build()
}

fn firewall_map(users: InMemoryUserProvider) -> Result<FirewallMap, ConfigError> {
    let dispatcher = EventDispatcher::new().with_handler(|event: &SecurityEvent| {
        log::info!("[security] {}", event);
    });

    FirewallMap::builder()
        .user_provider("memory", Arc::new(users))
        .firewall(
            FirewallContext::builder("api")
                .request_matcher(path("^/api")?)
                .stateless(true)
                .http_basic(HttpBasicConfig::new().realm("API"))
                .json_login(JsonLoginConfig::new().check_path("/api/login"))
                .dispatcher(dispatcher.clone())
                .access_map(AccessMap::new().add(path("^/api")?, &["ROLE_USER"], None)),
        )
        .firewall(
            FirewallContext::builder("main")
                .form_login(FormLoginConfig::new().default_target_path("/"))
                .remember_me(RememberMeConfig::new("demo-remember-me-secret").cookie_secure(false))
                .anonymous()
                .switch_user(SwitchUserConfig::new())
                .logout(LogoutConfig::new().delete_cookie("REMEMBERME", "/", None))
                .access_denied_url("/access-denied")
                .dispatcher(dispatcher)
                .access_map(
                    AccessMap::new()
                        .add(path("^/(login|access-denied)$")?, &["IS_AUTHENTICATED_ANONYMOUSLY"], None)
                        .add(path("^/profile$")?, &["IS_AUTHENTICATED_ANONYMOUSLY"], None)
                        .add(path("^/admin")?, &["ROLE_ADMIN"], None)
                        .add(path("^/")?, &["IS_AUTHENTICATED_REMEMBERED"], None),
                ),
        )
        .build()
}

fn print_startup_info() {
    println!("=== Actix Firewall Demo ===");
    println!();
    println!("Server: http://127.0.0.1:8080");
    println!();
    println!("Test Users (passwords are hashed with Argon2):");
    println!("  admin/admin - Roles: [ADMIN, USER, ALLOWED_TO_SWITCH]");
    println!("  user/user   - Roles: [USER]");
    println!("  guest/guest - Roles: [GUEST]");
    println!();
    println!("Firewall \"main\" (form login, remember-me, switch user, logout):");
    println!("  GET  /login               - login form");
    println!("  POST /login_check         - form login check");
    println!("  GET  /logout              - logout");
    println!("  GET  /                    - IS_AUTHENTICATED_REMEMBERED");
    println!("  GET  /profile             - anonymous allowed");
    println!("  GET  /admin/dashboard     - ROLE_ADMIN");
    println!("  GET  /admin/whoami?_switch_user=user - impersonate user");
    println!("  GET  /user/settings?_switch_user=_exit - exit impersonation");
    println!();
    println!("Firewall \"api\" (stateless, HTTP Basic or JSON login):");
    println!("  GET  /api/users           - ROLE_USER");
    println!("  POST /api/login           - JSON {{\"username\": ..., \"password\": ...}}");
    println!();
    println!("Examples:");
    println!("  curl -u user:user http://127.0.0.1:8080/api/users");
    println!("  curl -u guest:guest http://127.0.0.1:8080/api/users   # 403 Forbidden");
    println!();
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    print_startup_info();

    let firewall = Firewall::new(firewall_map(users()?)?);
    let key = Key::generate();

    HttpServer::new(move || {
        App::new()
            .wrap(firewall.clone())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .service(handlers::public::login)
            .service(handlers::public::access_denied)
            .service(handlers::home::index)
            .service(handlers::home::profile)
            .service(handlers::admin::admin_dashboard)
            .service(handlers::admin::whoami)
            .service(handlers::admin::user_settings)
            .service(handlers::api::api_users)
    })
    .bind("127.0.0.1:8080")?
    .run()
    .await?;

    Ok(())
}
