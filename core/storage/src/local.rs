//! Local filesystem storage provider.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::key::ObjectKey;
use crate::provider::{object_url, StorageProvider, StoredObject};
use resumevault_common::{Error, Result};

/// Local filesystem storage provider.
///
/// Stores objects under a root directory and hands out URLs below a public
/// base URL; the HTTP server serves that directory.
pub struct LocalProvider {
    root: PathBuf,
    base_url: String,
}

impl LocalProvider {
    /// Create a new local provider with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self {
            root,
            base_url: base_url.into(),
        })
    }

    /// Root directory objects are written under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert an ObjectKey to a filesystem path.
    fn to_fs_path(&self, key: &ObjectKey) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in key.components() {
            fs_path.push(component);
        }
        fs_path
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn put(&self, key: &ObjectKey, data: Bytes, content_type: &str) -> Result<StoredObject> {
        let fs_path = self.to_fs_path(key);

        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write beside the target and rename so readers never see a partial file.
        let staging = fs_path.with_file_name(format!(".{}.{}", key.name(), Uuid::new_v4()));
        fs::write(&staging, &data).await?;
        if let Err(e) = fs::rename(&staging, &fs_path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }

        let fs_meta = fs::metadata(&fs_path).await?;
        let stored_at: DateTime<Utc> = fs_meta
            .modified()
            .map(|t| t.into())
            .unwrap_or_else(|_| Utc::now());

        Ok(StoredObject {
            key: key.clone(),
            url: object_url(&self.base_url, key),
            size: fs_meta.len(),
            content_type: content_type.to_string(),
            stored_at,
            etag: Some(format!("{}-{}", stored_at.timestamp_millis(), fs_meta.len())),
        })
    }

    async fn get(&self, key: &ObjectKey) -> Result<Bytes> {
        let fs_path = self.to_fs_path(key);

        if !fs_path.is_file() {
            return Err(Error::NotFound(format!("Object not found: {}", key)));
        }

        Ok(Bytes::from(fs::read(&fs_path).await?))
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool> {
        Ok(self.to_fs_path(key).is_file())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<()> {
        let fs_path = self.to_fs_path(key);

        if !fs_path.is_file() {
            return Err(Error::NotFound(format!("Object not found: {}", key)));
        }

        fs::remove_file(&fs_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_put_get() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path(), "http://localhost:5000/files").unwrap();
        let key = ObjectKey::parse("resumes/u1/cv.pdf").unwrap();
        let data = Bytes::from_static(b"%PDF-1.4 local");

        let stored = provider.put(&key, data.clone(), "application/pdf").await.unwrap();

        assert_eq!(stored.size, data.len() as u64);
        assert_eq!(stored.url, "http://localhost:5000/files/resumes/u1/cv.pdf");
        assert!(temp.path().join("resumes/u1/cv.pdf").is_file());
        assert_eq!(provider.get(&key).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_local_leaves_no_staging_files() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path(), "http://x").unwrap();
        let key = ObjectKey::parse("d/cv.pdf").unwrap();

        provider.put(&key, Bytes::from_static(b"1"), "application/pdf").await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path().join("d")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_local_delete() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path(), "http://x").unwrap();
        let key = ObjectKey::parse("cv.pdf").unwrap();

        provider.put(&key, Bytes::from_static(b"1"), "application/pdf").await.unwrap();
        assert!(provider.exists(&key).await.unwrap());

        provider.delete(&key).await.unwrap();
        assert!(!provider.exists(&key).await.unwrap());
        assert!(matches!(provider.get(&key).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_local_creates_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested/uploads");
        let provider = LocalProvider::new(&root, "http://x").unwrap();
        assert!(provider.root().is_dir());
    }
}
