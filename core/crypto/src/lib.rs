//! Cryptographic primitives for ResumeVault.
//!
//! This module provides:
//! - Password hashing using Argon2id (PHC strings)
//! - Signed, expiring bearer tokens (HS256)
//! - Secret key handling with automatic zeroization
//!
//! # Security Guarantees
//! - Key material is zeroized on drop
//! - No password, hash, or token is ever logged
//! - Password comparison is constant-time

pub mod keys;
pub mod password;
pub mod token;

pub use keys::SigningKey;
pub use password::{equalize_timing, hash_password, verify_password, KdfParams};
pub use token::{TokenClaims, TokenSigner};
