//! Password hashing using Argon2id.
//!
//! Argon2id is a memory-hard password hashing function that provides
//! resistance to both GPU and time-memory trade-off attacks. Hashes are
//! stored as PHC strings, so the parameters travel with each hash and old
//! hashes stay verifiable after the defaults change.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use resumevault_common::{Error, Result};

/// Fixed salt for timing-equalization work. Never used for a stored hash.
const EQUALIZER_SALT: &[u8; 16] = b"resumevault-tick";

/// Parameters for Argon2id hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 19456 = 19 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Create parameters suitable for interactive logins.
    ///
    /// Follows the OWASP baseline for Argon2id.
    pub fn interactive() -> Self {
        Self {
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
        }
    }

    /// Cheap parameters for tests and local development only.
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Hash a password into a PHC string with a random salt.
///
/// # Preconditions
/// - `password` must not be empty
///
/// # Postconditions
/// - Returns a self-describing `$argon2id$...` string
/// - Two calls with the same password produce different strings
///
/// # Errors
/// - Returns error if password is empty
/// - Returns error if Argon2id parameters are invalid
///
/// # Security
/// - Password is not stored or logged
pub fn hash_password(password: &[u8], params: &KdfParams) -> Result<String> {
    if password.is_empty() {
        return Err(Error::Validation("Password cannot be empty".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .argon2()?
        .hash_password(password, &salt)
        .map_err(|e| Error::Crypto(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
///
/// The comparison inside argon2 is constant-time.
///
/// # Errors
/// - Returns `Crypto` if the stored hash cannot be parsed
pub fn verify_password(password: &[u8], stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| Error::Crypto(format!("Stored hash is malformed: {}", e)))?;

    match Argon2::default().verify_password(password, &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Crypto(format!("Password verification failed: {}", e))),
    }
}

/// Burn the same work a verification costs, discarding the result.
///
/// Called when a login names an unknown account so that response time
/// does not reveal whether the email exists.
pub fn equalize_timing(password: &[u8], params: &KdfParams) {
    let mut out = [0u8; 32];
    if let Ok(argon2) = params.argon2() {
        let _ = argon2.hash_password_into(password, EQUALIZER_SALT, &mut out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let params = KdfParams::fast();
        let hash = hash_password(b"secure-password", &params).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(b"secure-password", &hash).unwrap());
        assert!(!verify_password(b"wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let params = KdfParams::fast();
        let hash1 = hash_password(b"same", &params).unwrap();
        let hash2 = hash_password(b"same", &params).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_empty_password_fails() {
        assert!(hash_password(b"", &KdfParams::fast()).is_err());
    }

    #[test]
    fn test_malformed_stored_hash() {
        assert!(matches!(
            verify_password(b"anything", "not-a-phc-string"),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_hash_verifiable_after_default_change() {
        // Parameters are read back from the PHC string, not from the caller.
        let hash = hash_password(b"pw", &KdfParams::fast()).unwrap();
        assert!(hash.contains("m=1024,t=1,p=1"));
        assert!(verify_password(b"pw", &hash).unwrap());
    }

    #[test]
    fn test_default_is_interactive() {
        let params = KdfParams::default();
        assert_eq!(
            (params.memory_cost, params.time_cost, params.parallelism),
            (19456, 2, 1)
        );
    }

    #[test]
    fn test_equalize_timing_does_not_panic() {
        equalize_timing(b"whatever", &KdfParams::fast());
        equalize_timing(b"", &KdfParams::fast());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            #[test]
            fn only_the_hashed_password_verifies(
                password in "[ -~]{1,24}",
                other in "[ -~]{1,24}",
            ) {
                prop_assume!(password != other);
                let hash = hash_password(password.as_bytes(), &KdfParams::fast()).unwrap();

                prop_assert!(verify_password(password.as_bytes(), &hash).unwrap());
                prop_assert!(!verify_password(other.as_bytes(), &hash).unwrap());
            }
        }
    }
}
