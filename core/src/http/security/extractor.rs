//! Extractors giving handlers access to the token set by the firewall.

use std::future::{ready, Ready};
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};

use crate::http::error::AuthenticationError;
use crate::http::security::token::{AuthenticationTrustResolver, Token};
use crate::http::security::user::User;

/// The user behind a non-anonymous token.
///
/// # Usage
/// ```ignore
/// async fn handler(user: AuthenticatedUser) -> impl Responder {
///     format!("Hello, {}!", user.get_username())
/// }
/// ```
///
/// # Errors
/// Fails with `401 Unauthorized` when the request is anonymous or unsecured.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(User);

impl AuthenticatedUser {
    pub fn new(user: User) -> Self {
        AuthenticatedUser(user)
    }

    pub fn into_inner(self) -> User {
        self.0
    }
}

impl Deref for AuthenticatedUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.get_user()
                .map(AuthenticatedUser)
                .ok_or(AuthenticationError::CredentialsNotFound),
        )
    }
}

/// The token of the current request, if any. Never fails.
///
/// # Usage
/// ```ignore
/// async fn handler(token: CurrentToken) -> impl Responder {
///     match token.as_ref() {
///         Some(t) => format!("Hello, {}!", t.get_username()),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentToken(Option<Token>);

impl CurrentToken {
    pub fn into_inner(self) -> Option<Token> {
        self.0
    }

    /// True for a token that is neither missing nor anonymous.
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some() && !AuthenticationTrustResolver.is_anonymous(self.0.as_ref())
    }
}

impl Deref for CurrentToken {
    type Target = Option<Token>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for CurrentToken {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(CurrentToken(req.get_token())))
    }
}

/// Token helpers on [`HttpRequest`].
pub trait SecurityExt {
    fn get_token(&self) -> Option<Token>;

    /// The user of a non-anonymous token.
    fn get_user(&self) -> Option<User>;

    fn has_role(&self, role: &str) -> bool;

    fn has_any_role(&self, roles: &[&str]) -> bool;

    fn has_authority(&self, authority: &str) -> bool;

    /// Replaces the token; the firewall saves it once the response is ready.
    fn set_token(&self, token: Token);
}

impl SecurityExt for HttpRequest {
    fn get_token(&self) -> Option<Token> {
        self.extensions().get::<Token>().cloned()
    }

    fn get_user(&self) -> Option<User> {
        self.extensions()
            .get::<Token>()
            .filter(|t| !AuthenticationTrustResolver.is_anonymous(Some(t)))
            .and_then(|t| t.get_user().cloned())
    }

    fn has_role(&self, role: &str) -> bool {
        let role = role.strip_prefix("ROLE_").unwrap_or(role);
        self.extensions()
            .get::<Token>()
            .is_some_and(|t| t.has_role(role))
    }

    fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    fn has_authority(&self, authority: &str) -> bool {
        self.extensions()
            .get::<Token>()
            .is_some_and(|t| t.has_authority(authority))
    }

    fn set_token(&self, token: Token) {
        self.extensions_mut().insert(token);
    }
}
