//! Identities established before the request reached the application: TLS
//! client certificates and `REMOTE_USER`.
//!
//! The values are read from the [`ServerParams`] in the request extensions,
//! filled by whatever terminates TLS or authenticates in front of the app.
//!
//! [`ServerParams`]: crate::http::security::event::ServerParams

use std::sync::OnceLock;

use regex::Regex;

use crate::http::error::{AuthenticationError, FirewallError};
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::{check_username, FirewallListener, ListenerKind, LoginService, Supports};
use crate::http::security::token::Token;

static EMAIL_IN_DN: OnceLock<Option<Regex>> = OnceLock::new();

fn email_in_dn(dn: &str) -> Option<String> {
    let regex = EMAIL_IN_DN
        .get_or_init(|| Regex::new(r"emailAddress=([^,/@]+@[^,/]+)").ok())
        .as_ref()?;
    regex
        .captures(dn)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Where the user name comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreAuthenticatedSource {
    /// `user_key` holds the certificate e-mail, `credentials_key` the
    /// subject DN. The e-mail is looked up in the DN when `user_key` is unset.
    X509 { user_key: String, credentials_key: String },
    RemoteUser { user_key: String },
}

impl PreAuthenticatedSource {
    pub fn x509() -> Self {
        PreAuthenticatedSource::X509 {
            user_key: "SSL_CLIENT_S_DN_Email".to_string(),
            credentials_key: "SSL_CLIENT_S_DN".to_string(),
        }
    }

    pub fn remote_user() -> Self {
        PreAuthenticatedSource::RemoteUser {
            user_key: "REMOTE_USER".to_string(),
        }
    }

    /// `(username, credentials)` for the request.
    pub fn extract(&self, event: &RequestEvent) -> Result<(String, Option<String>), AuthenticationError> {
        match self {
            PreAuthenticatedSource::X509 {
                user_key,
                credentials_key,
            } => {
                let credentials = event.server(credentials_key);
                let user = event
                    .server(user_key)
                    .filter(|u| !u.is_empty())
                    .or_else(|| credentials.as_deref().and_then(email_in_dn));
                match user {
                    Some(user) => Ok((user, credentials)),
                    None => {
                        log::debug!("SSL credentials not found");
                        Err(AuthenticationError::BadCredentials)
                    }
                }
            }
            PreAuthenticatedSource::RemoteUser { user_key } => event
                .server(user_key)
                .filter(|u| !u.is_empty())
                .map(|u| (u, None))
                .ok_or_else(|| {
                    log::debug!("User key \"{}\" was not found in the server parameters", user_key);
                    AuthenticationError::BadCredentials
                }),
        }
    }
}

/// Authenticates the identity carried by server parameters.
///
/// No response is produced either way. A failed extraction or a rejected
/// user only clears a pre-authenticated token of this firewall.
pub struct PreAuthenticatedListener {
    login: LoginService,
    source: PreAuthenticatedSource,
}

impl PreAuthenticatedListener {
    pub fn new(login: LoginService, source: PreAuthenticatedSource) -> Self {
        PreAuthenticatedListener { login, source }
    }

    fn clear_token(&self, event: &mut RequestEvent, error: &AuthenticationError) {
        let owned = event
            .token()
            .map(|t| t.is_kind_pre_authenticated() && t.get_provider_key() == self.login.get_provider_key())
            .unwrap_or(false);
        if owned {
            log::info!("Cleared pre-authenticated token: {}", error);
            event.set_token(None);
        }
    }
}

impl FirewallListener for PreAuthenticatedListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::PreAuthenticated
    }

    fn supports(&self, _event: &mut RequestEvent) -> Supports {
        Supports::Yes
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        let (username, credentials) = match self.source.extract(event) {
            Ok(data) => data,
            Err(e) => {
                self.clear_token(event, &e);
                return Ok(());
            }
        };

        if self.login.is_already_authenticated(event, &username) {
            return Ok(());
        }

        log::debug!("Pre-authenticated user \"{}\"", username);

        let result = check_username(&username).and_then(|_| {
            self.login.authenticate(Token::pre_authenticated(
                &username,
                credentials.as_deref(),
                self.login.get_provider_key(),
            ))
        });
        match result {
            Ok(token) => self.login.login(event, token),
            Err(e) => {
                self.login.fail(event, Some(&username), &e);
                self.clear_token(event, &e);
            }
        }
        Ok(())
    }
}
