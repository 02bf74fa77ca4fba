//! Authentication tokens and their per-request storage.
//!
//! A [`Token`] is the outcome (or the request) of an authentication. Listeners
//! build unauthenticated tokens from request credentials, the
//! [`AuthenticationManager`](super::manager::AuthenticationManager) turns them
//! into authenticated ones, and the result lives in the [`TokenStorage`] of the
//! current request.

use serde::{Deserialize, Serialize};

use crate::http::security::user::User;

/// Username carried by anonymous tokens.
pub const ANONYMOUS_USERNAME: &str = "anon.";

/// Role granted to a token produced by a user switch.
pub const PREVIOUS_ADMIN_ROLE: &str = "PREVIOUS_ADMIN";

/// How a token came to be.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Username and password, from a form, JSON body or HTTP Basic header.
    UsernamePassword,
    /// Identity asserted by an upstream layer (client certificate, `REMOTE_USER`).
    PreAuthenticated,
    /// Restored from a remember-me cookie.
    RememberMe { secret: String },
    /// Placeholder identity for unauthenticated visitors.
    Anonymous { secret: String },
    /// Impersonation of another user; `original` is the token to go back to.
    SwitchUser { original: Box<Token> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    kind: TokenKind,
    username: String,
    user: Option<User>,
    credentials: Option<String>,
    roles: Vec<String>,
    authorities: Vec<String>,
    authenticated: bool,
    provider_key: String,
}

impl Token {
    fn unauthenticated(kind: TokenKind, username: &str, provider_key: &str) -> Self {
        Token {
            kind,
            username: username.to_string(),
            user: None,
            credentials: None,
            roles: Vec::new(),
            authorities: Vec::new(),
            authenticated: false,
            provider_key: provider_key.to_string(),
        }
    }

    /// Credentials as presented by the client, waiting for authentication.
    pub fn username_password(username: &str, password: &str, provider_key: &str) -> Self {
        let mut token = Token::unauthenticated(TokenKind::UsernamePassword, username, provider_key);
        token.credentials = Some(password.to_string());
        token
    }

    /// Identity asserted by an upstream layer, waiting for the user lookup.
    pub fn pre_authenticated(username: &str, credentials: Option<&str>, provider_key: &str) -> Self {
        let mut token = Token::unauthenticated(TokenKind::PreAuthenticated, username, provider_key);
        token.credentials = credentials.map(str::to_string);
        token
    }

    /// Token restored from a remember-me cookie. Trusted on creation.
    pub fn remember_me(user: User, provider_key: &str, secret: &str) -> Self {
        Token::unauthenticated(
            TokenKind::RememberMe {
                secret: secret.to_string(),
            },
            user.get_username(),
            provider_key,
        )
        .authenticate(user)
    }

    /// Anonymous token. Trusted on creation.
    pub fn anonymous(secret: &str, provider_key: &str) -> Self {
        let mut token = Token::unauthenticated(
            TokenKind::Anonymous {
                secret: secret.to_string(),
            },
            ANONYMOUS_USERNAME,
            provider_key,
        );
        token.authenticated = true;
        token
    }

    /// Token impersonating `user` on behalf of `original`.
    ///
    /// The target keeps its own roles and additionally gets
    /// [`PREVIOUS_ADMIN_ROLE`].
    pub fn switched(user: User, provider_key: &str, original: Token) -> Self {
        let mut token = Token::unauthenticated(
            TokenKind::SwitchUser {
                original: Box::new(original),
            },
            user.get_username(),
            provider_key,
        )
        .authenticate(user);
        if !token.roles.iter().any(|r| r == PREVIOUS_ADMIN_ROLE) {
            token.roles.push(PREVIOUS_ADMIN_ROLE.to_string());
        }
        token
    }

    /// Marks the token authenticated for `user`, taking over the user's
    /// roles and authorities.
    pub fn authenticate(mut self, user: User) -> Self {
        self.username = user.get_username().to_string();
        self.roles = user.get_roles().to_vec();
        self.authorities = user.get_authorities().to_vec();
        self.user = Some(user);
        self.authenticated = true;
        self
    }

    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn get_credentials(&self) -> Option<&str> {
        self.credentials.as_deref()
    }

    pub fn get_roles(&self) -> &[String] {
        &self.roles
    }

    pub fn get_authorities(&self) -> &[String] {
        &self.authorities
    }

    pub fn get_provider_key(&self) -> &str {
        &self.provider_key
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    pub fn erase_credentials(&mut self) {
        self.credentials = None;
    }

    /// Replaces the user, e.g. with a fresh copy loaded from the provider.
    ///
    /// Roles and authorities follow the new user. A switched token keeps
    /// [`PREVIOUS_ADMIN_ROLE`].
    pub fn set_user(&mut self, user: User) {
        let previous_admin = self.roles.iter().any(|r| r == PREVIOUS_ADMIN_ROLE);
        self.username = user.get_username().to_string();
        self.roles = user.get_roles().to_vec();
        if previous_admin && !self.roles.iter().any(|r| r == PREVIOUS_ADMIN_ROLE) {
            self.roles.push(PREVIOUS_ADMIN_ROLE.to_string());
        }
        self.authorities = user.get_authorities().to_vec();
        self.user = Some(user);
    }

    /// The token that was active before a user switch.
    pub fn original_token(&self) -> Option<&Token> {
        match &self.kind {
            TokenKind::SwitchUser { original } => Some(original),
            _ => None,
        }
    }

    pub fn is_kind_username_password(&self) -> bool {
        matches!(self.kind, TokenKind::UsernamePassword)
    }

    pub fn is_kind_pre_authenticated(&self) -> bool {
        matches!(self.kind, TokenKind::PreAuthenticated)
    }
}

/// Single-slot holder for the current request's token.
#[derive(Debug, Default)]
pub struct TokenStorage {
    token: Option<Token>,
}

impl TokenStorage {
    pub fn new(token: Option<Token>) -> Self {
        TokenStorage { token }
    }

    pub fn get_token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn set_token(&mut self, token: Option<Token>) {
        self.token = token;
    }

    pub fn take_token(&mut self) -> Option<Token> {
        self.token.take()
    }
}

/// Classifies tokens by how much they can be trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationTrustResolver;

impl AuthenticationTrustResolver {
    pub fn is_anonymous(&self, token: Option<&Token>) -> bool {
        matches!(token.map(Token::kind), Some(TokenKind::Anonymous { .. }))
    }

    pub fn is_remember_me(&self, token: Option<&Token>) -> bool {
        matches!(token.map(Token::kind), Some(TokenKind::RememberMe { .. }))
    }

    /// A token that is neither anonymous nor remembered. No token at all is
    /// not fully authenticated.
    pub fn is_fully_authenticated(&self, token: Option<&Token>) -> bool {
        token.is_some() && !self.is_anonymous(token) && !self.is_remember_me(token)
    }
}
