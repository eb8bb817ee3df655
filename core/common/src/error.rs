//! Common error types for ResumeVault.

use thiserror::Error;

use crate::types::SizeMb;

/// Top-level error type for ResumeVault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed caller input.
    #[error("{0}")]
    Validation(String),

    /// Local login failed. Never says whether the account exists.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Federated login for an email that never signed up.
    #[error("No account found. Please sign up first.")]
    AccountNotFound,

    /// Resource already exists (duplicate email).
    #[error("{0}")]
    Conflict(String),

    /// Upload would push the owner's ledger over the cap.
    #[error("Quota exceeded ({limit} MB)")]
    QuotaExceeded {
        used: SizeMb,
        requested: SizeMb,
        limit: SizeMb,
    },

    /// Resource not found, or not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    /// Bearer token past its expiry.
    #[error("Token expired")]
    TokenExpired,

    /// Bearer token malformed, forged, or minted for another purpose.
    #[error("Invalid token")]
    TokenInvalid,

    /// Object storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transient network failure talking to an upstream.
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream call exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Persistent store failure.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid runtime configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Hashing or signing primitive failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),
}

impl Error {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_) | Error::Io(_))
    }

    /// Whether the error is the caller's fault and safe to echo back.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::InvalidCredentials
                | Error::AccountNotFound
                | Error::Conflict(_)
                | Error::QuotaExceeded { .. }
                | Error::NotFound(_)
                | Error::TokenExpired
                | Error::TokenInvalid
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
