//! HTTP Basic authentication.

use std::sync::Arc;

use actix_web::http::header;
use base64::prelude::*;

use crate::http::error::FirewallError;
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::{check_username, FirewallListener, ListenerKind, LoginService, Supports};
use crate::http::security::handlers::{AuthenticationEntryPoint, BasicAuthenticationEntryPoint};
use crate::http::security::token::Token;

#[derive(Debug, Clone)]
pub struct HttpBasicConfig {
    realm: String,
    ignore_failure: bool,
}

impl HttpBasicConfig {
    /// Creates a new HTTP Basic configuration with default realm "Secured Area".
    pub fn new() -> Self {
        HttpBasicConfig {
            realm: "Secured Area".to_string(),
            ignore_failure: false,
        }
    }

    /// Sets the realm name for the WWW-Authenticate header.
    pub fn realm(mut self, realm: &str) -> Self {
        self.realm = realm.to_string();
        self
    }

    /// Lets failed attempts through without a challenge.
    pub fn ignore_failure(mut self, ignore: bool) -> Self {
        self.ignore_failure = ignore;
        self
    }

    pub fn get_realm(&self) -> &str {
        &self.realm
    }

    pub fn is_ignore_failure(&self) -> bool {
        self.ignore_failure
    }

    pub fn entry_point(&self) -> BasicAuthenticationEntryPoint {
        BasicAuthenticationEntryPoint::new(&self.realm)
    }
}

impl Default for HttpBasicConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses an `Authorization: Basic <base64(username:password)>` value.
pub fn decode_basic_credentials(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Authenticates requests carrying Basic credentials, or the
/// `AUTH_USER`/`AUTH_PASSWORD` server variables.
///
/// Success only stores the token. Failure answers with the Basic challenge
/// unless failures are ignored.
pub struct BasicAuthenticationListener {
    login: LoginService,
    config: HttpBasicConfig,
    entry_point: Arc<dyn AuthenticationEntryPoint>,
}

impl BasicAuthenticationListener {
    pub fn new(login: LoginService, config: HttpBasicConfig) -> Self {
        let entry_point = Arc::new(config.entry_point());
        BasicAuthenticationListener {
            login,
            config,
            entry_point,
        }
    }

    pub fn entry_point(mut self, entry_point: Arc<dyn AuthenticationEntryPoint>) -> Self {
        self.entry_point = entry_point;
        self
    }

    fn credentials(event: &RequestEvent) -> Option<(String, String)> {
        if let Some(user) = event.server("AUTH_USER") {
            return Some((user, event.server("AUTH_PASSWORD").unwrap_or_default()));
        }
        event
            .request()
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(decode_basic_credentials)
    }
}

impl FirewallListener for BasicAuthenticationListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::HttpBasic
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        Supports::from(Self::credentials(event).is_some())
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        let Some((username, password)) = Self::credentials(event) else {
            return Ok(());
        };

        if self.login.is_already_authenticated(event, &username) {
            return Ok(());
        }

        log::debug!("Basic authentication header found for user \"{}\"", username);

        let result = check_username(&username).and_then(|_| {
            self.login.authenticate(Token::username_password(
                &username,
                &password,
                self.login.get_provider_key(),
            ))
        });

        match result {
            Ok(token) => {
                self.login.login(event, token);
                Ok(())
            }
            Err(error) => {
                self.login.clear_token(event);
                self.login.fail(event, Some(&username), &error);
                if self.config.is_ignore_failure() {
                    return Ok(());
                }
                let response = self.entry_point.start(event, &error);
                event.set_response(response);
                Ok(())
            }
        }
    }
}
