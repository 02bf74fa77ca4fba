//! # Actix Firewall
//!
//! Request firewall for Actix Web, built around an ordered chain of
//! authentication and authorization listeners.
//!
//! This crate re-exports `actix-firewall-core` and adds a [`prelude`].
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! actix-web = "4"
//! actix-session = { version = "0.10", features = ["cookie-session"] }
//! actix-firewall = "0.1"
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use actix_web::{get, App, HttpResponse, HttpServer, Responder};
//! use actix_firewall::prelude::*;
//!
//! #[get("/admin")]
//! async fn admin(user: AuthenticatedUser) -> impl Responder {
//!     HttpResponse::Ok().body(format!("Welcome, Admin {}!", user.get_username()))
//! }
//!
//! let users = Arc::new(InMemoryUserProvider::new().with_user(
//!     User::new("admin".into(), "{noop}admin".into()).roles(&["ADMIN".into()]),
//! ));
//! let map = FirewallMap::builder()
//!     .user_provider("memory", users)
//!     .firewall(
//!         FirewallContext::builder("main")
//!             .form_login(FormLoginConfig::new())
//!             .logout(LogoutConfig::new())
//!             .anonymous()
//!             .access_map(AccessMap::new().add(
//!                 RequestMatcher::builder().path("^/admin").build()?,
//!                 &["ROLE_ADMIN"],
//!                 None,
//!             )),
//!     )
//!     .build()?;
//!
//! App::new()
//!     .wrap(Firewall::new(map))
//!     .wrap(SessionMiddleware::new(CookieSessionStore::default(), key))
//!     .service(admin)
//! ```
//!
//! The firewall needs `actix-session`'s `SessionMiddleware` around it for
//! stateful firewalls; it must be registered after `Firewall` so it runs
//! first.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `argon2` | Yes | Argon2 and delegating password encoders |
//!
//! ## Modules
//!
//! - [`http::security`] - the firewall, listeners, tokens and middleware
//! - [`http::error`] - Error types

pub use actix_firewall_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use actix_firewall_core::http::error::{
        AccessDeniedError, AuthenticationError, ConfigError, FirewallError,
    };
    pub use actix_firewall_core::http::security::firewall::{
        FormLoginConfig, HttpBasicConfig, JsonLoginConfig, LogoutConfig, SwitchUserConfig,
    };
    pub use actix_firewall_core::http::security::{
        AccessMap, AuthenticatedUser, Channel, CurrentToken, Firewall, FirewallContext,
        FirewallMap, InMemoryUserProvider, PasswordEncoder, RememberMeConfig, RequestMatcher,
        SecurityExt, SessionConfig, Token, User, UserProvider,
    };

    #[cfg(feature = "argon2")]
    pub use actix_firewall_core::http::security::{Argon2PasswordEncoder, DelegatingPasswordEncoder};
}
