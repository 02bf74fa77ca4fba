//! Remember-me services: persistent login through a signed cookie.
//!
//! The cookie value is `base64(base64(username):expires:signature)` where the
//! signature is `HMAC-SHA256(secret, "username:expires:password")`, hex
//! encoded. Signing the password hash invalidates every cookie as soon as the
//! password changes.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use actix_web::cookie::{Cookie, SameSite};
use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::logout::LogoutHandler;
use crate::http::security::token::Token;
use crate::http::security::user::User;
use crate::http::security::user_provider::UserProvider;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Remember-Me Configuration
// =============================================================================

#[derive(Clone)]
pub struct RememberMeConfig {
    /// Secret used to sign cookies and tokens
    key: String,
    token_validity: Duration,
    cookie_name: String,
    cookie_path: String,
    cookie_domain: Option<String>,
    cookie_secure: bool,
    cookie_http_only: bool,
    cookie_same_site: SameSite,
    /// Request parameter asking to be remembered
    parameter_name: String,
    always_remember: bool,
    catch_exceptions: bool,
}

impl RememberMeConfig {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            token_validity: Duration::from_secs(365 * 24 * 60 * 60),
            cookie_name: "REMEMBERME".to_string(),
            cookie_path: "/".to_string(),
            cookie_domain: None,
            cookie_secure: true,
            cookie_http_only: true,
            cookie_same_site: SameSite::Lax,
            parameter_name: "_remember_me".to_string(),
            always_remember: false,
            catch_exceptions: true,
        }
    }

    pub fn token_validity_days(mut self, days: u64) -> Self {
        self.token_validity = Duration::from_secs(days * 24 * 60 * 60);
        self
    }

    pub fn token_validity_seconds(mut self, seconds: u64) -> Self {
        self.token_validity = Duration::from_secs(seconds);
        self
    }

    pub fn cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = name.to_string();
        self
    }

    pub fn cookie_path(mut self, path: &str) -> Self {
        self.cookie_path = path.to_string();
        self
    }

    pub fn cookie_domain(mut self, domain: &str) -> Self {
        self.cookie_domain = Some(domain.to_string());
        self
    }

    pub fn cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub fn cookie_http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    pub fn cookie_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    pub fn parameter_name(mut self, name: &str) -> Self {
        self.parameter_name = name.to_string();
        self
    }

    /// Issue the cookie on every login, whatever the request parameter says.
    pub fn always_remember(mut self, always: bool) -> Self {
        self.always_remember = always;
        self
    }

    /// When false, a remembered token rejected by the authentication manager
    /// fails the request instead of leaving it unauthenticated.
    pub fn catch_exceptions(mut self, catch: bool) -> Self {
        self.catch_exceptions = catch;
        self
    }

    pub fn get_key(&self) -> &str {
        &self.key
    }

    pub fn get_token_validity(&self) -> Duration {
        self.token_validity
    }

    pub fn get_cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn get_cookie_path(&self) -> &str {
        &self.cookie_path
    }

    pub fn get_cookie_domain(&self) -> Option<&str> {
        self.cookie_domain.as_deref()
    }

    pub fn get_parameter_name(&self) -> &str {
        &self.parameter_name
    }

    pub fn is_always_remember(&self) -> bool {
        self.always_remember
    }

    pub fn is_catch_exceptions(&self) -> bool {
        self.catch_exceptions
    }
}

// =============================================================================
// Remember-Me Cookie
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberMeCookie {
    pub username: String,
    /// Expiry timestamp (seconds since UNIX epoch)
    pub expires: u64,
    pub signature: String,
}

impl RememberMeCookie {
    pub fn new(user: &User, expires: u64, key: &str) -> Option<Self> {
        Some(Self {
            username: user.get_username().to_string(),
            expires,
            signature: Self::sign(user.get_username(), expires, user.get_password(), key)?,
        })
    }

    fn mac(username: &str, expires: u64, password: &str, key: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
        mac.update(format!("{}:{}:{}", username, expires, password).as_bytes());
        Some(mac)
    }

    fn sign(username: &str, expires: u64, password: &str, key: &str) -> Option<String> {
        Self::mac(username, expires, password, key).map(|mac| hex::encode(mac.finalize().into_bytes()))
    }

    pub fn encode(&self) -> String {
        let data = format!(
            "{}:{}:{}",
            BASE64_STANDARD.encode(self.username.as_bytes()),
            self.expires,
            self.signature
        );
        BASE64_STANDARD.encode(data.as_bytes())
    }

    pub fn decode(encoded: &str) -> Option<Self> {
        let decoded = String::from_utf8(BASE64_STANDARD.decode(encoded).ok()?).ok()?;
        let mut parts = decoded.splitn(3, ':');
        let username = String::from_utf8(BASE64_STANDARD.decode(parts.next()?).ok()?).ok()?;
        let expires = parts.next()?.parse().ok()?;
        let signature = parts.next()?.to_string();
        Some(Self {
            username,
            expires,
            signature,
        })
    }

    /// Checks expiry, then the signature against the user's current password.
    pub fn is_valid_for(&self, user: &User, key: &str, now: u64) -> bool {
        if self.expires < now {
            return false;
        }
        let Ok(signature) = hex::decode(&self.signature) else {
            return false;
        };
        match Self::mac(&self.username, self.expires, user.get_password(), key) {
            Some(mac) => mac.verify_slice(&signature).is_ok(),
            None => false,
        }
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// Remember-Me Services
// =============================================================================

pub trait RememberMeServices: Send + Sync {
    /// Builds a remember-me token from the request cookie, if a valid one
    /// is present. Invalid cookies are cancelled.
    fn auto_login(&self, event: &mut RequestEvent) -> Option<Token>;

    /// Called when the remembered token was rejected or a login failed.
    fn login_fail(&self, event: &mut RequestEvent);

    /// Called after an interactive login; issues the cookie when asked to.
    fn login_success(&self, event: &mut RequestEvent, token: &Token);
}

/// Stateless signed-cookie remember-me services.
pub struct TokenBasedRememberMeServices {
    config: RememberMeConfig,
    user_provider: Arc<dyn UserProvider>,
    provider_key: String,
}

impl TokenBasedRememberMeServices {
    pub fn new(config: RememberMeConfig, user_provider: Arc<dyn UserProvider>, provider_key: &str) -> Self {
        Self {
            config,
            user_provider,
            provider_key: provider_key.to_string(),
        }
    }

    pub fn config(&self) -> &RememberMeConfig {
        &self.config
    }

    fn cancel_cookie(&self, event: &mut RequestEvent) {
        log::debug!("Clearing remember-me cookie \"{}\"", self.config.cookie_name);
        event.remove_cookie(
            &self.config.cookie_name,
            &self.config.cookie_path,
            self.config.cookie_domain.as_deref(),
        );
    }

    fn is_remember_me_requested(&self, event: &RequestEvent) -> bool {
        if self.config.always_remember {
            return true;
        }
        matches!(
            event.parameter(&self.config.parameter_name),
            Some("true" | "on" | "1" | "yes")
        )
    }

    fn create_cookie(&self, value: String) -> Cookie<'static> {
        let max_age =
            actix_web::cookie::time::Duration::seconds(self.config.token_validity.as_secs() as i64);

        let mut cookie = Cookie::build(self.config.cookie_name.clone(), value)
            .path(self.config.cookie_path.clone())
            .max_age(max_age)
            .http_only(self.config.cookie_http_only)
            .same_site(self.config.cookie_same_site);

        if let Some(domain) = &self.config.cookie_domain {
            cookie = cookie.domain(domain.clone());
        }

        if self.config.cookie_secure {
            cookie = cookie.secure(true);
        }

        cookie.finish()
    }
}

impl RememberMeServices for TokenBasedRememberMeServices {
    fn auto_login(&self, event: &mut RequestEvent) -> Option<Token> {
        let cookie = event.cookie(&self.config.cookie_name)?;

        let Some(decoded) = RememberMeCookie::decode(cookie.value()) else {
            log::debug!("Remember-me cookie could not be decoded");
            self.cancel_cookie(event);
            return None;
        };

        let user = match self.user_provider.load_user_by_username(&decoded.username) {
            Ok(user) => user,
            Err(e) => {
                log::debug!("Remember-me user \"{}\" rejected: {}", decoded.username, e);
                self.cancel_cookie(event);
                return None;
            }
        };

        if !decoded.is_valid_for(&user, &self.config.key, now()) {
            log::debug!("Remember-me cookie for \"{}\" is expired or forged", decoded.username);
            self.cancel_cookie(event);
            return None;
        }

        log::info!("Remember-me cookie accepted for \"{}\"", decoded.username);
        Some(Token::remember_me(user, &self.provider_key, &self.config.key))
    }

    fn login_fail(&self, event: &mut RequestEvent) {
        self.cancel_cookie(event);
    }

    fn login_success(&self, event: &mut RequestEvent, token: &Token) {
        if !self.is_remember_me_requested(event) {
            log::debug!("Remember-me was not requested");
            return;
        }
        let Some(user) = token.get_user() else {
            return;
        };
        let expires = now() + self.config.token_validity.as_secs();
        match RememberMeCookie::new(user, expires, &self.config.key) {
            Some(value) => event.add_cookie(self.create_cookie(value.encode())),
            None => log::warn!("Could not sign the remember-me cookie"),
        }
    }
}

impl LogoutHandler for TokenBasedRememberMeServices {
    fn logout(&self, event: &mut RequestEvent, _token: &Token) {
        self.cancel_cookie(event);
    }
}
