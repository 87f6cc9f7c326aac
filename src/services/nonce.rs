/*
 * Responsibility
 * - Per-request CSP nonce generation
 * - Entropy source sits behind NonceSource so tests can swap it
 */
use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use uuid::{Builder, Uuid};

#[derive(Debug, Error)]
#[error("entropy source unavailable: {0}")]
pub struct NonceError(String);

impl NonceError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Opaque per-request token. Only ever lives for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Nonce(String);

impl Nonce {
    /// Base64 of the hyphenated v4 UUID (122 random bits).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(STANDARD.encode(id.hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh nonces. Shared across requests, so it must be `Sync`.
pub trait NonceSource: Send + Sync + 'static {
    fn generate(&self) -> Result<Nonce, NonceError>;
}

/// Reads 16 bytes from the OS CSPRNG and shapes them into a v4 UUID.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn generate(&self) -> Result<Nonce, NonceError> {
        let mut bytes = [0u8; 16];
        getrandom::fill(&mut bytes).map_err(|e| NonceError::new(e.to_string()))?;
        Ok(Nonce::from_uuid(Builder::from_random_bytes(bytes).into_uuid()))
    }
}
