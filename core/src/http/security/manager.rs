//! Authentication manager and the providers it delegates to.
//!
//! [`ProviderManager`] asks each [`AuthenticationProvider`] that supports the
//! presented token in turn; the first success wins and account status
//! failures stop the search.

use std::sync::Arc;

use crate::http::error::AuthenticationError;
use crate::http::security::crypto::PasswordEncoder;
use crate::http::security::token::{Token, TokenKind};
use crate::http::security::user_provider::{UserChecker, UserProvider};

/// Turns unauthenticated tokens into authenticated ones.
pub trait AuthenticationManager: Send + Sync {
    fn authenticate(&self, token: Token) -> Result<Token, AuthenticationError>;
}

/// Authenticates one family of tokens.
pub trait AuthenticationProvider: Send + Sync {
    fn supports(&self, token: &Token) -> bool;

    fn authenticate(&self, token: Token) -> Result<Token, AuthenticationError>;
}

pub struct ProviderManager {
    providers: Vec<Arc<dyn AuthenticationProvider>>,
    erase_credentials: bool,
}

impl ProviderManager {
    pub fn new() -> Self {
        ProviderManager {
            providers: Vec::new(),
            erase_credentials: true,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Whether credentials are dropped from successful tokens (default: true).
    pub fn erase_credentials(mut self, erase: bool) -> Self {
        self.erase_credentials = erase;
        self
    }
}

impl Default for ProviderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationManager for ProviderManager {
    fn authenticate(&self, token: Token) -> Result<Token, AuthenticationError> {
        let mut last_error = None;

        for provider in self.providers.iter().filter(|p| p.supports(&token)) {
            match provider.authenticate(token.clone()) {
                Ok(mut authenticated) => {
                    if self.erase_credentials {
                        authenticated.erase_credentials();
                    }
                    return Ok(authenticated);
                }
                Err(e) if e.is_account_status() => {
                    last_error = Some(e);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }

        let error = last_error.unwrap_or(AuthenticationError::ProviderNotFound);
        log::debug!(
            "Authentication of \"{}\" failed: {}",
            token.get_username(),
            error
        );
        Err(error)
    }
}

/// Checks username/password tokens against a [`UserProvider`].
///
/// Unknown users are reported as bad credentials unless
/// `hide_user_not_found` is turned off.
pub struct DaoAuthenticationProvider {
    user_provider: Arc<dyn UserProvider>,
    user_checker: Arc<dyn UserChecker>,
    password_encoder: Arc<dyn PasswordEncoder>,
    provider_key: String,
    hide_user_not_found: bool,
}

impl DaoAuthenticationProvider {
    pub fn new(
        user_provider: Arc<dyn UserProvider>,
        user_checker: Arc<dyn UserChecker>,
        password_encoder: Arc<dyn PasswordEncoder>,
        provider_key: &str,
    ) -> Self {
        DaoAuthenticationProvider {
            user_provider,
            user_checker,
            password_encoder,
            provider_key: provider_key.to_string(),
            hide_user_not_found: true,
        }
    }

    pub fn hide_user_not_found(mut self, hide: bool) -> Self {
        self.hide_user_not_found = hide;
        self
    }
}

impl AuthenticationProvider for DaoAuthenticationProvider {
    fn supports(&self, token: &Token) -> bool {
        token.is_kind_username_password() && token.get_provider_key() == self.provider_key
    }

    fn authenticate(&self, token: Token) -> Result<Token, AuthenticationError> {
        let user = match self.user_provider.load_user_by_username(token.get_username()) {
            Ok(user) => user,
            Err(AuthenticationError::UsernameNotFound) if self.hide_user_not_found => {
                return Err(AuthenticationError::BadCredentials)
            }
            Err(e) => return Err(e),
        };

        self.user_checker.check_pre_auth(&user)?;

        let presented = token.get_credentials().unwrap_or_default();
        if presented.is_empty() || !self.password_encoder.matches(presented, user.get_password()) {
            return Err(AuthenticationError::BadCredentials);
        }

        self.user_checker.check_post_auth(&user)?;
        Ok(token.authenticate(user))
    }
}

/// Loads the user named by a pre-authenticated token. No password check.
pub struct PreAuthenticatedAuthenticationProvider {
    user_provider: Arc<dyn UserProvider>,
    user_checker: Arc<dyn UserChecker>,
    provider_key: String,
}

impl PreAuthenticatedAuthenticationProvider {
    pub fn new(
        user_provider: Arc<dyn UserProvider>,
        user_checker: Arc<dyn UserChecker>,
        provider_key: &str,
    ) -> Self {
        PreAuthenticatedAuthenticationProvider {
            user_provider,
            user_checker,
            provider_key: provider_key.to_string(),
        }
    }
}

impl AuthenticationProvider for PreAuthenticatedAuthenticationProvider {
    fn supports(&self, token: &Token) -> bool {
        token.is_kind_pre_authenticated() && token.get_provider_key() == self.provider_key
    }

    fn authenticate(&self, token: Token) -> Result<Token, AuthenticationError> {
        if token.get_username().is_empty() {
            return Err(AuthenticationError::BadCredentials);
        }
        let user = self.user_provider.load_user_by_username(token.get_username())?;
        self.user_checker.check_post_auth(&user)?;
        Ok(token.authenticate(user))
    }
}

/// Validates remember-me tokens by their shared secret.
pub struct RememberMeAuthenticationProvider {
    user_checker: Arc<dyn UserChecker>,
    secret: String,
    provider_key: String,
}

impl RememberMeAuthenticationProvider {
    pub fn new(user_checker: Arc<dyn UserChecker>, secret: &str, provider_key: &str) -> Self {
        RememberMeAuthenticationProvider {
            user_checker,
            secret: secret.to_string(),
            provider_key: provider_key.to_string(),
        }
    }
}

impl AuthenticationProvider for RememberMeAuthenticationProvider {
    fn supports(&self, token: &Token) -> bool {
        matches!(token.kind(), TokenKind::RememberMe { .. })
            && token.get_provider_key() == self.provider_key
    }

    fn authenticate(&self, token: Token) -> Result<Token, AuthenticationError> {
        match token.kind() {
            TokenKind::RememberMe { secret } if *secret == self.secret => {}
            _ => return Err(AuthenticationError::BadCredentials),
        }
        let user = token
            .get_user()
            .ok_or(AuthenticationError::BadCredentials)?;
        self.user_checker.check_pre_auth(user)?;
        self.user_checker.check_post_auth(user)?;
        Ok(token)
    }
}

/// Validates anonymous tokens by their shared secret.
pub struct AnonymousAuthenticationProvider {
    secret: String,
}

impl AnonymousAuthenticationProvider {
    pub fn new(secret: &str) -> Self {
        AnonymousAuthenticationProvider {
            secret: secret.to_string(),
        }
    }
}

impl AuthenticationProvider for AnonymousAuthenticationProvider {
    fn supports(&self, token: &Token) -> bool {
        matches!(token.kind(), TokenKind::Anonymous { .. })
    }

    fn authenticate(&self, token: Token) -> Result<Token, AuthenticationError> {
        match token.kind() {
            TokenKind::Anonymous { secret } if *secret == self.secret => Ok(token),
            _ => Err(AuthenticationError::BadCredentials),
        }
    }
}
