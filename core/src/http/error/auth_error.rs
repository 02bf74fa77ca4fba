use std::cell::RefCell;
use std::fmt;

use actix_web::{error, http::StatusCode, HttpResponse, HttpResponseBuilder};
use derive_more::{Display, Error};

/// Failure to authenticate a request.
///
/// Raised by authentication listeners, providers and the access listener.
/// The exception listener turns it into an entry-point response; without an
/// entry point it renders as `401 Unauthorized`.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationError {
    #[display("Invalid credentials.")]
    BadCredentials,
    #[display("Username could not be found.")]
    UsernameNotFound,
    #[display("Invalid CSRF token.")]
    InvalidCsrfToken,
    #[display("Full authentication is required to access this resource.")]
    InsufficientAuthentication,
    #[display("Authentication credentials could not be found.")]
    CredentialsNotFound,
    #[display("No session available, it either timed out or cookies are not enabled.")]
    SessionUnavailable,
    #[display("No authentication provider found to support the authentication token.")]
    ProviderNotFound,
    #[display("Account is disabled.")]
    AccountDisabled,
    #[display("Account is locked.")]
    AccountLocked,
    #[display("Account has expired.")]
    AccountExpired,
    #[display("Credentials have expired.")]
    CredentialsExpired,
}

impl AuthenticationError {
    /// Whether the failure concerns the state of the account rather than the
    /// presented credentials. Such failures also discard the stored token.
    pub fn is_account_status(&self) -> bool {
        matches!(
            self,
            AuthenticationError::AccountDisabled
                | AuthenticationError::AccountLocked
                | AuthenticationError::AccountExpired
                | AuthenticationError::CredentialsExpired
        )
    }

    /// Stable machine-readable key, used when the error is stored in the session.
    pub fn key(&self) -> &'static str {
        match self {
            AuthenticationError::BadCredentials => "bad_credentials",
            AuthenticationError::UsernameNotFound => "username_not_found",
            AuthenticationError::InvalidCsrfToken => "invalid_csrf_token",
            AuthenticationError::InsufficientAuthentication => "insufficient_authentication",
            AuthenticationError::CredentialsNotFound => "credentials_not_found",
            AuthenticationError::SessionUnavailable => "session_unavailable",
            AuthenticationError::ProviderNotFound => "provider_not_found",
            AuthenticationError::AccountDisabled => "account_disabled",
            AuthenticationError::AccountLocked => "account_locked",
            AuthenticationError::AccountExpired => "account_expired",
            AuthenticationError::CredentialsExpired => "credentials_expired",
        }
    }
}

impl error::ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(self.status_code()).body(self.to_string())
    }
}

/// Failure to authorize an authenticated (or anonymous) request.
///
/// Carries the attributes that were checked and the path (or subject) they
/// were checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDeniedError {
    message: String,
    attributes: Vec<String>,
    subject: Option<String>,
}

impl AccessDeniedError {
    pub fn new(message: &str) -> Self {
        AccessDeniedError {
            message: message.to_string(),
            attributes: Vec::new(),
            subject: None,
        }
    }

    pub fn attributes(mut self, attributes: &[String]) -> Self {
        self.attributes = attributes.to_vec();
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn get_message(&self) -> &str {
        &self.message
    }

    pub fn get_attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn get_subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

impl Default for AccessDeniedError {
    fn default() -> Self {
        AccessDeniedError::new("Access Denied.")
    }
}

impl fmt::Display for AccessDeniedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AccessDeniedError {}

impl error::ResponseError for AccessDeniedError {
    fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(self.status_code()).body(self.message.clone())
    }
}

/// Failure while logging out, e.g. a missing or invalid CSRF token.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum LogoutError {
    #[display("Invalid CSRF token.")]
    InvalidCsrfToken,
}

impl error::ResponseError for LogoutError {
    fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(self.status_code()).body(self.to_string())
    }
}

/// An error that already carries the response to send.
///
/// The response can be taken out exactly once, either through
/// [`LazyResponseError::take_response`] or when actix renders the error.
pub struct LazyResponseError {
    response: RefCell<Option<HttpResponse>>,
}

impl LazyResponseError {
    pub fn new(response: HttpResponse) -> Self {
        LazyResponseError {
            response: RefCell::new(Some(response)),
        }
    }

    pub fn take_response(&self) -> Option<HttpResponse> {
        self.response.borrow_mut().take()
    }

    pub fn into_response(self) -> Option<HttpResponse> {
        self.response.into_inner()
    }
}

impl fmt::Debug for LazyResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResponseError")
            .field("pending", &self.response.borrow().is_some())
            .finish()
    }
}

impl fmt::Display for LazyResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("A response was provided in place of the regular flow.")
    }
}

impl std::error::Error for LazyResponseError {}

impl error::ResponseError for LazyResponseError {
    fn status_code(&self) -> StatusCode {
        self.response
            .borrow()
            .as_ref()
            .map(|r| r.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        self.take_response()
            .unwrap_or_else(|| HttpResponse::InternalServerError().finish())
    }
}
