//! In-memory storage provider for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::key::ObjectKey;
use crate::provider::{object_url, StorageProvider, StoredObject};
use resumevault_common::{Error, Result};

const DEFAULT_BASE_URL: &str = "memory://objects";

/// In-memory storage entry.
#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    object: StoredObject,
}

/// In-memory storage provider.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop.
pub struct MemoryProvider {
    storage: Arc<RwLock<HashMap<String, Entry>>>,
    base_url: String,
}

impl MemoryProvider {
    /// Create a new empty memory provider.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a provider whose URLs start with `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            base_url: base_url.into(),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Check if no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> Error {
        Error::Storage("Memory provider lock poisoned".to_string())
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &ObjectKey, data: Bytes, content_type: &str) -> Result<StoredObject> {
        let object = StoredObject {
            key: key.clone(),
            url: object_url(&self.base_url, key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            stored_at: Utc::now(),
            etag: Some(Uuid::new_v4().to_string()),
        };

        self.storage.write().map_err(|_| Self::poisoned())?.insert(
            key.as_string(),
            Entry {
                data,
                object: object.clone(),
            },
        );

        Ok(object)
    }

    async fn get(&self, key: &ObjectKey) -> Result<Bytes> {
        let storage = self.storage.read().map_err(|_| Self::poisoned())?;
        storage
            .get(&key.as_string())
            .map(|entry| entry.data.clone())
            .ok_or_else(|| Error::NotFound(format!("Object not found: {}", key)))
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool> {
        Ok(self
            .storage
            .read()
            .map_err(|_| Self::poisoned())?
            .contains_key(&key.as_string()))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<()> {
        let mut storage = self.storage.write().map_err(|_| Self::poisoned())?;
        match storage.remove(&key.as_string()) {
            Some(entry) => {
                tracing::debug!(key = %entry.object.key, "Removed object");
                Ok(())
            }
            None => Err(Error::NotFound(format!("Object not found: {}", key))),
        }
    }
}
