//! Persistent identity and document store for ResumeVault.
//!
//! Users and resumes live in one database so the quota ledger (each
//! user's `total_size`) is updated in the same transaction as the resume
//! rows it summarizes.

pub mod models;
pub mod sqlite;
pub mod store;

pub use models::{LedgerDrift, NewResume, NewUser, Resume, User};
pub use sqlite::SqliteStore;
pub use store::{DocumentStore, IdentityStore};
