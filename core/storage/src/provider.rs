//! Storage provider trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::ObjectKey;
use resumevault_common::Result;

/// Result of a successful write: where the object lives and how big it is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    /// Key the object was written under.
    pub key: ObjectKey,
    /// Durable URL clients can fetch the object from.
    pub url: String,
    /// Size in bytes as reported by the backend.
    pub size: u64,
    /// Declared content type.
    pub content_type: String,
    /// When the backend accepted the write.
    pub stored_at: DateTime<Utc>,
    /// ETag or revision ID, if the backend has one.
    pub etag: Option<String>,
}

/// Storage provider trait for different backends.
///
/// Implementations must handle their own authentication. Callers apply
/// timeouts and retries; providers should fail fast and classify transient
/// failures as `Error::Network`, `Error::Timeout` or `Error::Io`.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider name (e.g., "local", "memory").
    fn name(&self) -> &str;

    /// Write an object, replacing any object under the same key.
    ///
    /// # Postconditions
    /// - Object is durable and reachable at the returned URL
    /// - `StoredObject::size` is the stored byte count
    ///
    /// # Errors
    /// - Network/I/O errors
    /// - Authentication errors
    async fn put(&self, key: &ObjectKey, data: Bytes, content_type: &str)
        -> Result<StoredObject>;

    /// Read an object back.
    ///
    /// # Errors
    /// - `NotFound` if nothing is stored under `key`
    async fn get(&self, key: &ObjectKey) -> Result<Bytes>;

    /// Check if an object exists.
    async fn exists(&self, key: &ObjectKey) -> Result<bool>;

    /// Delete an object.
    ///
    /// # Errors
    /// - `NotFound` if nothing is stored under `key`
    async fn delete(&self, key: &ObjectKey) -> Result<()>;
}

/// Join a public base URL and an object key.
pub fn object_url(base_url: &str, key: &ObjectKey) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key.as_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_object_serialization() {
        let stored = StoredObject {
            key: ObjectKey::parse("resumes/u/a.pdf").unwrap(),
            url: "http://localhost/files/resumes/u/a.pdf".to_string(),
            size: 1024,
            content_type: "application/pdf".to_string(),
            stored_at: Utc::now(),
            etag: Some("abc123".to_string()),
        };

        let json = serde_json::to_string(&stored).unwrap();
        let deserialized: StoredObject = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.key, stored.key);
        assert_eq!(deserialized.size, stored.size);
    }

    #[test]
    fn test_object_url_joins_cleanly() {
        let key = ObjectKey::parse("resumes/u/a.pdf").unwrap();
        assert_eq!(
            object_url("http://localhost:5000/files/", &key),
            "http://localhost:5000/files/resumes/u/a.pdf"
        );
    }
}
