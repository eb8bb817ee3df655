//! Store traits.
//!
//! The HTTP-facing crates only see these traits; `SqliteStore` is the
//! production implementation.

use async_trait::async_trait;

use crate::models::{LedgerDrift, NewResume, NewUser, Resume, User};
use resumevault_common::{Email, ResumeId, Result, SizeMb, UserId};

/// Durable user records.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create a user.
    ///
    /// # Errors
    /// - `Conflict` if a user with the same normalized email exists
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Look up a user by normalized email.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>>;

    /// Look up a user by id.
    async fn find_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Replace a local account's password hash.
    ///
    /// # Errors
    /// - `NotFound` if no such user exists
    async fn update_password_hash(&self, id: &UserId, password_hash: String) -> Result<()>;
}

/// Durable resume records and the per-user quota ledger.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current ledger total for a user.
    ///
    /// # Errors
    /// - `NotFound` if no such user exists
    async fn ledger_total(&self, user: &UserId) -> Result<SizeMb>;

    /// Insert a resume and charge its size to the owner's ledger atomically.
    ///
    /// # Postconditions
    /// - On success the resume exists and the ledger grew by its size
    /// - On any error neither happened
    ///
    /// # Errors
    /// - `QuotaExceeded` if the charge would take the ledger above `limit`
    /// - `NotFound` if the owner does not exist
    async fn commit_upload(&self, new_resume: NewResume, limit: SizeMb) -> Result<Resume>;

    /// Remove a resume owned by `user` and refund its size, clamping at zero.
    ///
    /// # Errors
    /// - `NotFound` if the resume does not exist or belongs to someone else
    async fn commit_delete(&self, user: &UserId, resume: &ResumeId) -> Result<Resume>;

    /// A user's resumes, newest first.
    async fn list_resumes(&self, user: &UserId) -> Result<Vec<Resume>>;

    /// Recompute one user's ledger from their resumes.
    ///
    /// # Errors
    /// - `NotFound` if no such user exists
    async fn reconcile_user(&self, user: &UserId) -> Result<LedgerDrift>;

    /// Recompute every user's ledger.
    async fn reconcile_all(&self) -> Result<Vec<LedgerDrift>>;
}
