use std::error::Error as StdError;
use std::fmt;

use super::{AccessDeniedError, AuthenticationError, LazyResponseError, LogoutError};

/// Error returned by a firewall listener.
///
/// Each variant wraps one of the security errors; the wrapped error is
/// exposed through [`std::error::Error::source`] so the exception listener
/// can find it by walking the chain.
#[derive(Debug)]
pub enum FirewallError {
    Authentication(AuthenticationError),
    AccessDenied(AccessDeniedError),
    Logout(LogoutError),
    LazyResponse(LazyResponseError),
    Internal(Box<dyn StdError + 'static>),
}

impl FirewallError {
    pub fn internal<E: StdError + 'static>(error: E) -> Self {
        FirewallError::Internal(Box::new(error))
    }
}

impl fmt::Display for FirewallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirewallError::Authentication(e) => write!(f, "authentication failed: {}", e),
            FirewallError::AccessDenied(e) => write!(f, "access denied: {}", e),
            FirewallError::Logout(e) => write!(f, "logout failed: {}", e),
            FirewallError::LazyResponse(e) => write!(f, "{}", e),
            FirewallError::Internal(e) => write!(f, "firewall failure: {}", e),
        }
    }
}

impl StdError for FirewallError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FirewallError::Authentication(e) => Some(e),
            FirewallError::AccessDenied(e) => Some(e),
            FirewallError::Logout(e) => Some(e),
            FirewallError::LazyResponse(e) => Some(e),
            FirewallError::Internal(e) => Some(e.as_ref()),
        }
    }
}

impl From<AuthenticationError> for FirewallError {
    fn from(error: AuthenticationError) -> Self {
        FirewallError::Authentication(error)
    }
}

impl From<AccessDeniedError> for FirewallError {
    fn from(error: AccessDeniedError) -> Self {
        FirewallError::AccessDenied(error)
    }
}

impl From<LogoutError> for FirewallError {
    fn from(error: LogoutError) -> Self {
        FirewallError::Logout(error)
    }
}

impl From<LazyResponseError> for FirewallError {
    fn from(error: LazyResponseError) -> Self {
        FirewallError::LazyResponse(error)
    }
}

impl From<FirewallError> for actix_web::Error {
    fn from(error: FirewallError) -> Self {
        match error {
            FirewallError::Authentication(e) => e.into(),
            FirewallError::AccessDenied(e) => e.into(),
            FirewallError::Logout(e) => e.into(),
            FirewallError::LazyResponse(e) => e.into(),
            FirewallError::Internal(e) => {
                actix_web::error::ErrorInternalServerError(e.to_string())
            }
        }
    }
}
