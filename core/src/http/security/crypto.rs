//! Password encoders used by the DAO authentication provider.
//!
//! # Feature Flags
//! - `argon2`: enables [`Argon2PasswordEncoder`] and [`DelegatingPasswordEncoder`] (default)

#[cfg(feature = "argon2")]
use argon2::password_hash::rand_core::OsRng;
#[cfg(feature = "argon2")]
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
#[cfg(feature = "argon2")]
use argon2::Argon2;
use derive_more::{Display, Error};

/// Raised when a password could not be hashed.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum PasswordEncoderError {
    #[display("password hashing failed")]
    HashingFailed,
}

/// Encodes passwords and verifies presented passwords against stored hashes.
pub trait PasswordEncoder: Send + Sync {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordEncoderError>;

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool;
}

/// Argon2id password encoder.
///
/// # Example
/// ```
/// use actix_firewall_core::http::security::crypto::{PasswordEncoder, Argon2PasswordEncoder};
///
/// let encoder = Argon2PasswordEncoder::new();
/// let hash = encoder.encode("secret_password").unwrap();
///
/// assert!(encoder.matches("secret_password", &hash));
/// assert!(!encoder.matches("wrong_password", &hash));
/// ```
#[cfg(feature = "argon2")]
#[derive(Clone)]
pub struct Argon2PasswordEncoder {
    argon2: Argon2<'static>,
}

#[cfg(feature = "argon2")]
impl Argon2PasswordEncoder {
    pub fn new() -> Self {
        Argon2PasswordEncoder {
            argon2: Argon2::default(),
        }
    }
}

#[cfg(feature = "argon2")]
impl Default for Argon2PasswordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "argon2")]
impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordEncoderError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw_password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                log::error!("argon2 hashing failed: {}", e);
                PasswordEncoderError::HashingFailed
            })
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        match PasswordHash::new(encoded_password) {
            Ok(parsed_hash) => self
                .argon2
                .verify_password(raw_password.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Plain-text encoder. Only meant for tests and demos.
#[derive(Clone, Copy, Default)]
pub struct NoOpPasswordEncoder;

impl PasswordEncoder for NoOpPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordEncoderError> {
        Ok(raw_password.to_string())
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        raw_password == encoded_password
    }
}

/// Encoder that picks the algorithm from a `{id}` prefix on the stored hash.
///
/// - `{argon2}hash` - Argon2 encoded password
/// - `{noop}plain` - plain text
///
/// Hashes without a prefix are compared as plain text.
///
/// ```
/// use actix_firewall_core::http::security::crypto::{PasswordEncoder, DelegatingPasswordEncoder};
///
/// let encoder = DelegatingPasswordEncoder::new();
/// let hash = encoder.encode("password").unwrap();
/// assert!(hash.starts_with("{argon2}"));
/// assert!(encoder.matches("password", &hash));
/// assert!(encoder.matches("plain", "{noop}plain"));
/// ```
#[cfg(feature = "argon2")]
#[derive(Clone, Default)]
pub struct DelegatingPasswordEncoder {
    argon2: Argon2PasswordEncoder,
}

#[cfg(feature = "argon2")]
impl DelegatingPasswordEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "argon2")]
impl PasswordEncoder for DelegatingPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordEncoderError> {
        Ok(format!("{{argon2}}{}", self.argon2.encode(raw_password)?))
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        if let Some(hash) = encoded_password.strip_prefix("{argon2}") {
            self.argon2.matches(raw_password, hash)
        } else if let Some(plain) = encoded_password.strip_prefix("{noop}") {
            raw_password == plain
        } else {
            raw_password == encoded_password
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_encoder() {
        let encoder = NoOpPasswordEncoder;
        let encoded = encoder.encode("plain_password").unwrap();
        assert_eq!(encoded, "plain_password");
        assert!(encoder.matches("plain_password", &encoded));
        assert!(!encoder.matches("other", &encoded));
    }

    #[cfg(feature = "argon2")]
    #[test]
    fn test_argon2_encoder() {
        let encoder = Argon2PasswordEncoder::new();
        let hash = encoder.encode("test_password_123").unwrap();

        assert_ne!(hash, "test_password_123");
        assert!(encoder.matches("test_password_123", &hash));
        assert!(!encoder.matches("wrong_password", &hash));
        assert!(!encoder.matches("test_password_123", "not-a-phc-string"));
    }

    #[cfg(feature = "argon2")]
    #[test]
    fn test_delegating_encoder() {
        let encoder = DelegatingPasswordEncoder::new();
        let hash = encoder.encode("password").unwrap();

        assert!(hash.starts_with("{argon2}"));
        assert!(encoder.matches("password", &hash));
        assert!(encoder.matches("plain", "{noop}plain"));
        assert!(encoder.matches("legacy", "legacy"));
    }
}
