//! Common types used throughout ResumeVault.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use uuid::Uuid;
use zeroize::Zeroize;

/// Bytes in one megabyte, as reported by storage providers.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Parse an identifier received from a caller.
            ///
            /// # Errors
            /// - Returns `NotFound` if `id` is not a UUID, so malformed ids
            ///   look exactly like ids that do not exist
            pub fn parse(id: &str) -> crate::Result<Self> {
                Uuid::parse_str(id)
                    .map(|uuid| Self(uuid.to_string()))
                    .map_err(|_| crate::Error::NotFound(format!("{} not found", $label)))
            }

            /// Wrap a value already known to be valid (e.g. read from the store).
            pub fn from_trusted(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the inner string value.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a user.
    UserId,
    "User"
);

uuid_id!(
    /// Unique identifier for a stored resume.
    ResumeId,
    "Document"
);

/// Case-normalized email address.
///
/// Two addresses that differ only in case or surrounding whitespace are
/// the same `Email`; this is what makes email uniqueness case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Normalize and validate an email address.
    ///
    /// # Errors
    /// - Returns `Validation` if the address is empty or has no `@`
    ///   separating a non-empty local part and domain
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(crate::Error::Validation("Email is required".to_string()));
        }
        match normalized.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(normalized))
            }
            _ => Err(crate::Error::Validation("Invalid email address".to_string())),
        }
    }

    /// Get the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which provider authenticated a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email and password stored locally.
    Local,
    /// Google OAuth federation.
    Google,
}

impl AuthProvider {
    /// Stable tag used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
        }
    }
}

impl FromStr for AuthProvider {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "google" => Ok(AuthProvider::Google),
            other => Err(crate::Error::Serialization(format!(
                "Unknown auth provider: {}",
                other
            ))),
        }
    }
}

/// Size in megabytes with two-decimal fixed-point precision.
///
/// Stored as hundredths of a megabyte so that ledger sums and differences
/// are exact. Serializes as a JSON number (`3.25`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeMb(u64);

impl SizeMb {
    /// Zero megabytes.
    pub const ZERO: Self = Self(0);

    /// Convert a byte count, rounding half up to two decimals.
    pub fn from_bytes(bytes: u64) -> Self {
        let scaled = u128::from(bytes) * 100;
        let per_mb = u128::from(BYTES_PER_MB);
        Self(((scaled + per_mb / 2) / per_mb) as u64)
    }

    /// Construct from hundredths of a megabyte.
    pub const fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    /// Construct from a whole number of megabytes.
    pub const fn from_whole_mb(mb: u64) -> Self {
        Self(mb * 100)
    }

    /// Hundredths of a megabyte.
    pub const fn hundredths(&self) -> u64 {
        self.0
    }

    /// Value as a float, for display and JSON.
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Byte count this size stands for, rounded down.
    pub fn to_bytes(&self) -> u64 {
        ((u128::from(self.0) * u128::from(BYTES_PER_MB)) / 100) as u64
    }
}

impl Add for SizeMb {
    type Output = SizeMb;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for SizeMb {
    type Output = SizeMb;

    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl std::iter::Sum for SizeMb {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(SizeMb::ZERO, |acc, s| acc + s)
    }
}

impl fmt::Display for SizeMb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}", whole, frac)
        }
    }
}

impl FromStr for SizeMb {
    type Err = crate::Error;

    /// Parse a decimal megabyte amount such as `20` or `4.5`.
    fn from_str(s: &str) -> crate::Result<Self> {
        let invalid = || crate::Error::Validation(format!("Invalid megabyte amount: {}", s));
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return Err(invalid());
        }
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let frac: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Serialize for SizeMb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for SizeMb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() || value < 0.0 {
            return Err(serde::de::Error::custom("size must be a non-negative number"));
        }
        Ok(Self((value * 100.0).round() as u64))
    }
}

/// Secret string that zeroizes on drop and never prints its value.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Expose the secret for use in a primitive.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}
