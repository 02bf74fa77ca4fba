//! CSRF token management for the login form and logout listeners.
//!
//! Tokens are random hex strings stored in the session, one per token id
//! (`authenticate` for the login form, `logout` for logout links).
//!
//! # Example
//! ```rust,ignore
//! use actix_firewall_core::http::security::csrf::{CsrfTokenManager, SessionCsrfTokenManager};
//!
//! async fn login_page(req: HttpRequest) -> impl Responder {
//!     let token = SessionCsrfTokenManager::new().get_token(&req, "authenticate");
//!     // <input type="hidden" name="_csrf_token" value="{token.value()}">
//! }
//! ```

use actix_session::SessionExt;
use actix_web::HttpRequest;
use rand::Rng;
use subtle::ConstantTimeEq;

// =============================================================================
// CSRF Token
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    id: String,
    value: String,
}

impl CsrfToken {
    pub fn new(id: &str, value: &str) -> Self {
        CsrfToken {
            id: id.to_string(),
            value: value.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

// =============================================================================
// CSRF Token Manager
// =============================================================================

pub trait CsrfTokenManager: Send + Sync {
    /// The current token for `token_id`, generated on first use.
    fn get_token(&self, req: &HttpRequest, token_id: &str) -> CsrfToken;

    /// Replaces the token for `token_id` with a fresh one.
    fn refresh_token(&self, req: &HttpRequest, token_id: &str) -> CsrfToken;

    /// Removes the token, returning its value if there was one.
    fn remove_token(&self, req: &HttpRequest, token_id: &str) -> Option<String>;

    /// Whether `value` equals the stored token for `token_id`. A missing
    /// value or a missing stored token is never valid.
    fn is_token_valid(&self, req: &HttpRequest, token_id: &str, value: Option<&str>) -> bool;

    /// Removes every token this manager stored.
    fn clear(&self, req: &HttpRequest);
}

/// Stores tokens in the session under `<namespace>/<token id>`.
#[derive(Debug, Clone)]
pub struct SessionCsrfTokenManager {
    namespace: String,
}

impl Default for SessionCsrfTokenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCsrfTokenManager {
    pub fn new() -> Self {
        SessionCsrfTokenManager {
            namespace: "_csrf".to_string(),
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    fn key(&self, token_id: &str) -> String {
        format!("{}/{}", self.namespace, token_id)
    }

    fn generate_value() -> String {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(bytes)
    }

    fn store(&self, req: &HttpRequest, token_id: &str, value: &str) {
        if let Err(e) = req.get_session().insert(self.key(token_id), value) {
            log::warn!("Could not store CSRF token \"{}\": {}", token_id, e);
        }
    }
}

impl CsrfTokenManager for SessionCsrfTokenManager {
    fn get_token(&self, req: &HttpRequest, token_id: &str) -> CsrfToken {
        let stored = req
            .get_session()
            .get::<String>(&self.key(token_id))
            .ok()
            .flatten();
        match stored {
            Some(value) => CsrfToken::new(token_id, &value),
            None => self.refresh_token(req, token_id),
        }
    }

    fn refresh_token(&self, req: &HttpRequest, token_id: &str) -> CsrfToken {
        let value = Self::generate_value();
        self.store(req, token_id, &value);
        CsrfToken::new(token_id, &value)
    }

    fn remove_token(&self, req: &HttpRequest, token_id: &str) -> Option<String> {
        req.get_session().remove_as::<String>(&self.key(token_id))?.ok()
    }

    fn is_token_valid(&self, req: &HttpRequest, token_id: &str, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match req.get_session().get::<String>(&self.key(token_id)) {
            Ok(Some(stored)) => stored.as_bytes().ct_eq(value.as_bytes()).into(),
            _ => false,
        }
    }

    fn clear(&self, req: &HttpRequest) {
        let session = req.get_session();
        let prefix = format!("{}/", self.namespace);
        let keys: Vec<String> = session
            .entries()
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in keys {
            session.remove(&key);
        }
    }
}
