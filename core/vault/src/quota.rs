//! Quota policy and usage reporting.

use serde::Serialize;

use resumevault_common::{SizeMb, BYTES_PER_MB};

/// Default per-user storage cap.
pub const DEFAULT_QUOTA_LIMIT_MB: u64 = 20;

/// Default cap on a single uploaded file.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 4;

/// Usage at or above this percentage is reported as near the limit.
pub const NEAR_LIMIT_PERCENT: f64 = 75.0;

/// Limits applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    /// Cap on a user's cumulative stored size.
    pub limit: SizeMb,
    /// Cap on one file, in bytes.
    pub max_file_bytes: u64,
}

impl QuotaPolicy {
    /// Create a policy.
    pub fn new(limit: SizeMb, max_file_bytes: u64) -> Self {
        Self {
            limit,
            max_file_bytes,
        }
    }

    /// Whether charging `requested` on top of `used` would pass the cap.
    pub fn would_exceed(&self, used: SizeMb, requested: SizeMb) -> bool {
        used + requested > self.limit
    }

    /// Summarize a ledger total against the cap.
    pub fn usage(&self, used: SizeMb) -> UsageReport {
        let percent = if self.limit == SizeMb::ZERO {
            if used == SizeMb::ZERO { 0.0 } else { 100.0 }
        } else {
            // Basis points, clamped for display only.
            let bp = (u128::from(used.hundredths()) * 10_000 / u128::from(self.limit.hundredths()))
                .min(10_000);
            bp as f64 / 100.0
        };

        UsageReport {
            used_mb: used,
            limit_mb: self.limit,
            remaining_mb: self.limit.saturating_sub(used),
            percent,
            near_limit: percent >= NEAR_LIMIT_PERCENT,
        }
    }
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self::new(
            SizeMb::from_whole_mb(DEFAULT_QUOTA_LIMIT_MB),
            DEFAULT_MAX_FILE_SIZE_MB * BYTES_PER_MB,
        )
    }
}

/// A user's storage consumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub used_mb: SizeMb,
    pub limit_mb: SizeMb,
    pub remaining_mb: SizeMb,
    pub percent: f64,
    pub near_limit: bool,
}
