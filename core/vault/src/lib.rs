//! Quota-enforced document storage for ResumeVault.
//!
//! This module provides:
//! - Upload orchestration: validate, write to storage, commit with the ledger charge
//! - Delete orchestration: commit with the ledger refund, then remove the object
//! - Quota policy and usage reporting
//!
//! # Architecture
//! The vault sits between the HTTP surface and the storage provider and
//! store, which it only sees through their traits.

pub mod orchestrator;
pub mod quota;

pub use orchestrator::{DocumentVault, UploadFile, UploadRequest, MAX_NAME_CHARS, PDF_CONTENT_TYPE};
pub use quota::{QuotaPolicy, UsageReport, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_QUOTA_LIMIT_MB};
