//! Key types with secure memory handling.
//!
//! Key material zeroizes its memory on drop and never appears in debug output.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use resumevault_common::{Error, Result};

/// Minimum accepted length of a token signing secret, in bytes.
pub const MIN_SIGNING_KEY_LENGTH: usize = 16;

/// HMAC secret used to sign and verify bearer tokens.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    key: Vec<u8>,
}

impl SigningKey {
    /// Create a signing key from a configured secret.
    ///
    /// # Preconditions
    /// - `secret` must be at least `MIN_SIGNING_KEY_LENGTH` bytes
    ///
    /// # Errors
    /// - Returns `Configuration` if the secret is too short
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SIGNING_KEY_LENGTH {
            return Err(Error::Configuration(format!(
                "Signing secret must be at least {} bytes",
                MIN_SIGNING_KEY_LENGTH
            )));
        }
        Ok(Self {
            key: secret.to_vec(),
        })
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey([REDACTED])")
    }
}
