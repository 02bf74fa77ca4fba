//! # Actix Firewall Core
//!
//! Request firewall for Actix Web: an ordered chain of authentication and
//! authorization listeners selected per firewall zone, with token storage,
//! session fixation protection and exception-to-response translation.
//!
//! The public surface lives under [`http::security`] and [`http::error`].

pub mod http;
