//! Firewall, authentication and authorization.
//!
//! # Module Structure
//!
//! - `firewall` - the listener pipeline, [`FirewallMap`] and every listener
//! - `middleware` - the [`Firewall`] Actix Web middleware
//! - `request_matcher` / `access_map` - request predicates and access rules
//! - `token` - authentication tokens and per-request token storage
//! - `event` - the per-request [`RequestEvent`] listeners work on
//! - `manager` - authentication manager and providers
//! - `authorizer` - access decision manager and voters
//! - `user` / `user_provider` - user model, providers and account checks
//! - `crypto` - password encoding (Argon2, NoOp, Delegating)
//! - `session` - session keys and the session authentication strategy
//! - `csrf` - CSRF token manager
//! - `remember_me` - remember-me cookies
//! - `handlers` - entry points, success/failure and access denied handlers
//! - `events` - security events and their dispatcher
//! - `extractor` - Actix Web extractors (AuthenticatedUser, CurrentToken)
//!
//! # Feature Flags
//! - `argon2`: Enables `Argon2PasswordEncoder` and `DelegatingPasswordEncoder`

pub use access_map::{AccessMap, Channel};
pub use authorizer::{
    AccessDecisionManager, AuthenticatedVoter, AuthorityVoter, DecisionStrategy, RoleVoter, Subject,
    Vote, Voter, VoterDecisionManager,
};
pub use crypto::{NoOpPasswordEncoder, PasswordEncoder, PasswordEncoderError};
#[cfg(feature = "argon2")]
pub use crypto::{Argon2PasswordEncoder, DelegatingPasswordEncoder};
pub use csrf::{CsrfToken, CsrfTokenManager, SessionCsrfTokenManager};
pub use event::{RequestAttributes, RequestBody, RequestEvent, ServerParams};
pub use events::{EventDispatcher, InMemoryEventStore, SecurityEvent, SecurityEventHandler};
pub use extractor::{AuthenticatedUser, CurrentToken, SecurityExt};
pub use firewall::{FirewallBuilder, FirewallContext, FirewallListener, FirewallMap, Supports};
pub use handlers::{
    AccessDeniedHandler, AuthenticationEntryPoint, AuthenticationFailureHandler,
    AuthenticationSuccessHandler, BasicAuthenticationEntryPoint, FormAuthenticationEntryPoint,
};
pub use manager::{AuthenticationManager, AuthenticationProvider, ProviderManager};
pub use middleware::Firewall;
pub use remember_me::{RememberMeConfig, RememberMeServices, TokenBasedRememberMeServices};
pub use request_matcher::{RequestMatcher, RequestMatcherBuilder};
pub use session::{SessionAuthenticationStrategy, SessionConfig};
pub use token::{AuthenticationTrustResolver, Token, TokenKind, TokenStorage};
pub use user::User;
pub use user_provider::{DefaultUserChecker, InMemoryUserProvider, UserChecker, UserProvider};

mod extractor;
mod user;

pub mod access_map;
pub mod authorizer;
pub mod crypto;
pub mod csrf;
pub mod event;
pub mod events;
pub mod firewall;
pub mod handlers;
pub mod http_utils;
pub mod manager;
pub mod middleware;
pub mod remember_me;
pub mod request_matcher;
pub mod session;
pub mod token;
pub mod user_provider;
