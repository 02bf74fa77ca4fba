//! Error types raised by the firewall pipeline.
//!
//! - [`AuthenticationError`] - credential and account failures, recovered by the
//!   exception listener as a challenge or redirect
//! - [`AccessDeniedError`] - authorization failures
//! - [`LogoutError`] - logout failures, logged and otherwise ignored
//! - [`LazyResponseError`] - carries a ready response to adopt as-is
//! - [`FirewallError`] - what a listener returns
//! - [`ConfigError`] - build-time configuration failures

mod auth_error;
mod config_error;
mod firewall_error;

pub use auth_error::{AccessDeniedError, AuthenticationError, LazyResponseError, LogoutError};
pub use config_error::ConfigError;
pub use firewall_error::FirewallError;
