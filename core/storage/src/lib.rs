//! Object storage for uploaded documents.
//!
//! A trait-based interface over storage backends (local filesystem,
//! in-memory) plus a registry for resolving a backend from configuration
//! and a retry executor for transient failures.
//!
//! # Design Principles
//! - Provider isolation: no backend-specific logic outside this crate
//! - Async operations: all I/O is async
//! - Unified error semantics: transient failures are `Network`, `Timeout` or `Io`

pub mod key;
pub mod local;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod retry;

pub use key::ObjectKey;
pub use local::LocalProvider;
pub use memory::MemoryProvider;
pub use provider::{object_url, StorageProvider, StoredObject};
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry};
pub use retry::{with_timeout, RetryConfig, RetryExecutor};
