//! Records persisted by the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use resumevault_common::{AuthProvider, Email, ResumeId, SizeMb, UserId};

/// A user account, local or federated.
///
/// `password_hash` is present iff `provider` is `Local`; the schema
/// enforces this with a CHECK constraint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(rename = "totalSizeMB")]
    pub total_size: SizeMb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the account can log in with a password.
    pub fn has_local_credential(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Fields for a user about to be created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
}

impl NewUser {
    /// A password account.
    pub fn local(name: impl Into<String>, email: Email, password_hash: String) -> Self {
        Self {
            name: name.into(),
            email,
            password_hash: Some(password_hash),
            provider: AuthProvider::Local,
            provider_id: None,
        }
    }

    /// A federated account with no local credential.
    pub fn federated(
        name: impl Into<String>,
        email: Email,
        provider: AuthProvider,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email,
            password_hash: None,
            provider,
            provider_id: Some(external_id.into()),
        }
    }
}

/// A stored resume. Its size is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: ResumeId,
    pub user: UserId,
    pub filename: String,
    pub url: String,
    #[serde(skip)]
    pub storage_key: String,
    #[serde(rename = "sizeMB")]
    pub size: SizeMb,
    pub created_at: DateTime<Utc>,
}

/// A resume whose object is already in storage, ready to be committed.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub user: UserId,
    pub filename: String,
    pub url: String,
    pub storage_key: String,
    pub size: SizeMb,
}

/// Ledger state of one user before and after a recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDrift {
    pub user_id: UserId,
    pub email: Email,
    /// Total that was recorded on the user.
    pub recorded: SizeMb,
    /// Sum of the user's resume sizes, now recorded.
    pub actual: SizeMb,
}

impl LedgerDrift {
    /// Whether the recorded total disagreed with the resumes.
    pub fn is_drifted(&self) -> bool {
        self.recorded != self.actual
    }
}
