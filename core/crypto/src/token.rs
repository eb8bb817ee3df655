//! Signed bearer tokens (HS256 JWT).
//!
//! Tokens are self-contained: verifying one needs only the signing key,
//! never a store lookup. Every claims type carries a `purpose` so that a
//! token minted for one flow is rejected by another.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::keys::SigningKey;
use resumevault_common::{Error, Result};

/// Claims that can be carried by a signed token.
pub trait TokenClaims: Serialize + DeserializeOwned {
    /// Purpose tag every token of this type must carry.
    const PURPOSE: &'static str;

    /// Purpose tag carried by this instance.
    fn purpose(&self) -> &str;
}

/// Issues and verifies signed tokens.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    /// Create a signer from a signing key.
    pub fn new(key: &SigningKey) -> Self {
        Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
        }
    }

    /// Sign a set of claims.
    ///
    /// # Errors
    /// - Returns `Crypto` if encoding fails
    pub fn sign<C: TokenClaims>(&self, claims: &C) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| Error::Crypto(format!("Token signing failed: {}", e)))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    /// - `TokenExpired` if `exp` is in the past (no leeway)
    /// - `TokenInvalid` for bad signatures, malformed tokens, or a
    ///   purpose other than `C::PURPOSE`
    pub fn verify<C: TokenClaims>(&self, token: &str) -> Result<C> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<C>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => Error::TokenExpired,
                other => {
                    debug!(reason = ?other, "Rejected token");
                    Error::TokenInvalid
                }
            }
        })?;

        if data.claims.purpose() != C::PURPOSE {
            debug!(purpose = data.claims.purpose(), expected = C::PURPOSE, "Token purpose mismatch");
            return Err(Error::TokenInvalid);
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenSigner([REDACTED])")
    }
}
