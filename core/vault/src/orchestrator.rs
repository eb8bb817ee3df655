//! Upload and delete orchestration.
//!
//! An upload writes the object first and then commits the resume row and
//! the ledger charge in one store transaction. The store's conditional
//! increment is the authority on the cap; the pre-check here only avoids
//! storage writes that are certain to be rejected.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::quota::{QuotaPolicy, UsageReport};
use resumevault_common::{Error, Result, ResumeId, SizeMb, UserId};
use resumevault_storage::{ObjectKey, RetryConfig, RetryExecutor, StorageProvider};
use resumevault_store::{DocumentStore, NewResume, Resume};

/// Only content type accepted for uploads.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Longest accepted display name, in characters after trimming.
pub const MAX_NAME_CHARS: usize = 20;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Client-side file name, informational only.
    pub filename: String,
    /// Declared content type.
    pub content_type: String,
    pub data: Bytes,
}

/// Everything a client sent for one upload. Fields are optional because
/// a multipart form may omit any of them.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user: UserId,
    pub name: Option<String>,
    pub file: Option<UploadFile>,
}

/// Coordinates object storage, resume records and the quota ledger.
#[derive(Clone)]
pub struct DocumentVault {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn StorageProvider>,
    policy: QuotaPolicy,
    retry: RetryExecutor,
}

impl DocumentVault {
    /// Create a vault.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn StorageProvider>,
        policy: QuotaPolicy,
        retry: RetryConfig,
    ) -> Self {
        Self {
            store,
            provider,
            policy,
            retry: RetryExecutor::new(retry),
        }
    }

    /// Get the quota policy.
    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Store a resume and charge it to the owner's quota.
    ///
    /// The work runs on its own task: once validation passes, dropping the
    /// returned future does not abort the storage write or the commit.
    ///
    /// # Postconditions
    /// - On success the resume exists and the ledger grew by its size
    /// - On error no resume exists and the ledger is unchanged
    ///
    /// # Errors
    /// - `Validation` for a bad name or file, before storage is touched
    /// - `QuotaExceeded` if the upload would pass the cap
    /// - `Storage`, `Network`, `Timeout` or `Io` from the storage write
    pub async fn upload(&self, request: UploadRequest) -> Result<Resume> {
        let (name, file) = self.validate(request.name, request.file)?;
        let user = request.user;

        let vault = self.clone();
        tokio::spawn(async move { vault.store_and_commit(user, name, file).await })
            .await
            .map_err(|e| Error::Storage(format!("Upload task failed: {}", e)))?
    }

    fn validate(
        &self,
        name: Option<String>,
        file: Option<UploadFile>,
    ) -> Result<(String, UploadFile)> {
        let name = name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Validation("Resume name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(Error::Validation(format!(
                "Resume name must be at most {} characters",
                MAX_NAME_CHARS
            )));
        }

        let file = file.ok_or_else(|| Error::Validation("No file uploaded".to_string()))?;

        let essence = file.content_type.split(';').next().unwrap_or_default().trim();
        if !essence.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
            return Err(Error::Validation("Only PDF files are allowed".to_string()));
        }
        if file.data.len() as u64 > self.policy.max_file_bytes {
            return Err(Error::Validation(format!(
                "File too large (max {} MB)",
                SizeMb::from_bytes(self.policy.max_file_bytes)
            )));
        }
        if file.data.is_empty() {
            return Err(Error::Validation("File is empty".to_string()));
        }

        Ok((name.to_string(), file))
    }

    async fn store_and_commit(&self, user: UserId, name: String, file: UploadFile) -> Result<Resume> {
        let local_size = SizeMb::from_bytes(file.data.len() as u64);
        let used = self.store.ledger_total(&user).await?;
        if self.policy.would_exceed(used, local_size) {
            debug!(user_id = %user, used_mb = %used, size_mb = %local_size, "Upload rejected before storage write");
            return Err(Error::QuotaExceeded {
                used,
                requested: local_size,
                limit: self.policy.limit,
            });
        }

        let key = ObjectKey::for_resume(&user);
        let provider = &self.provider;
        let key_ref = &key;
        let data = &file.data;
        let stored = self
            .retry
            .execute("storage put", move || {
                provider.put(key_ref, data.clone(), PDF_CONTENT_TYPE)
            })
            .await?;

        let size = SizeMb::from_bytes(stored.size);
        debug!(user_id = %user, key = %stored.key, size_mb = %size, "Object stored");

        let new_resume = NewResume {
            user: user.clone(),
            filename: name,
            url: stored.url.clone(),
            storage_key: stored.key.as_string(),
            size,
        };

        match self.store.commit_upload(new_resume, self.policy.limit).await {
            Ok(resume) => Ok(resume),
            Err(err) => {
                warn!(
                    user_id = %user,
                    key = %stored.key,
                    error = %err,
                    "Commit rejected, stored object is orphaned"
                );
                Err(err)
            }
        }
    }

    /// Delete one of the caller's resumes and refund its size.
    ///
    /// Returns once the commit is durable. The storage object is removed
    /// best-effort on a detached task; failing to remove it is logged and
    /// never delays or fails the delete.
    ///
    /// # Errors
    /// - `NotFound` if the id is malformed, unknown, or owned by someone else
    pub async fn delete(&self, user: &UserId, resume_id: &str) -> Result<Resume> {
        let id = ResumeId::parse(resume_id)?;
        let removed = self.store.commit_delete(user, &id).await?;
        info!(user_id = %user, resume_id = %removed.id, "Resume deleted");

        match ObjectKey::parse(&removed.storage_key) {
            Ok(key) => {
                let vault = self.clone();
                tokio::spawn(async move { vault.remove_object(key).await });
            }
            Err(e) => warn!(key = %removed.storage_key, error = %e, "Unparseable storage key"),
        }

        Ok(removed)
    }

    async fn remove_object(&self, key: ObjectKey) {
        let provider = &self.provider;
        let key_ref = &key;
        let result = self
            .retry
            .execute("storage delete", move || provider.delete(key_ref))
            .await;

        match result {
            Ok(()) => debug!(key = %key, "Object removed"),
            Err(Error::NotFound(_)) => debug!(key = %key, "Object already gone"),
            Err(e) => warn!(key = %key, error = %e, "Object removal failed, object is orphaned"),
        }
    }

    /// The caller's resumes, newest first.
    pub async fn list(&self, user: &UserId) -> Result<Vec<Resume>> {
        self.store.list_resumes(user).await
    }

    /// The caller's storage consumption.
    pub async fn usage(&self, user: &UserId) -> Result<UsageReport> {
        let used = self.store.ledger_total(user).await?;
        Ok(self.policy.usage(used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use resumevault_common::{Email, BYTES_PER_MB};
    use resumevault_storage::{MemoryProvider, StoredObject};
    use resumevault_store::{IdentityStore, NewUser, SqliteStore};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn mb(whole: u64) -> SizeMb {
        SizeMb::from_whole_mb(whole)
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(2)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    /// Wait for detached cleanup to leave `expected` objects behind.
    async fn settle(objects: &MemoryProvider, expected: usize) {
        for _ in 0..100 {
            if objects.len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(objects.len(), expected);
    }

    /// Policy with the file cap raised so megabyte-scale scenarios fit.
    fn roomy_policy() -> QuotaPolicy {
        QuotaPolicy::new(mb(20), 32 * BYTES_PER_MB)
    }

    async fn new_user(store: &SqliteStore, address: &str) -> UserId {
        store
            .create_user(NewUser::local(
                "Test",
                Email::parse(address).unwrap(),
                "$argon2id$stub".to_string(),
            ))
            .await
            .unwrap()
            .id
    }

    fn pdf(bytes: u64) -> UploadFile {
        UploadFile {
            filename: "cv.pdf".to_string(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            data: Bytes::from(vec![0x25u8; bytes as usize]),
        }
    }

    fn request(user: &UserId, name: &str, file: UploadFile) -> UploadRequest {
        UploadRequest {
            user: user.clone(),
            name: Some(name.to_string()),
            file: Some(file),
        }
    }

    struct Fixture {
        vault: DocumentVault,
        store: SqliteStore,
        objects: Arc<MemoryProvider>,
    }

    fn fixture(policy: QuotaPolicy) -> Fixture {
        let store = SqliteStore::in_memory().unwrap();
        let objects = Arc::new(MemoryProvider::new());
        let vault = DocumentVault::new(
            Arc::new(store.clone()),
            objects.clone(),
            policy,
            fast_retry(),
        );
        Fixture {
            vault,
            store,
            objects,
        }
    }

    #[tokio::test]
    async fn test_upload_then_over_quota() {
        let f = fixture(roomy_policy());
        let user = new_user(&f.store, "ada@example.com").await;

        let resume = f
            .vault
            .upload(request(&user, "Frontend Dev", pdf(5 * BYTES_PER_MB)))
            .await
            .unwrap();
        assert_eq!(resume.size, mb(5));
        assert_eq!(resume.filename, "Frontend Dev");
        assert!(resume.url.ends_with(".pdf"));
        assert_eq!(f.store.ledger_total(&user).await.unwrap(), mb(5));

        let rejected = f
            .vault
            .upload(request(&user, "Big", pdf(16 * BYTES_PER_MB)))
            .await;
        assert!(matches!(rejected, Err(Error::QuotaExceeded { .. })));
        assert_eq!(f.store.ledger_total(&user).await.unwrap(), mb(5));
        assert_eq!(f.vault.list(&user).await.unwrap().len(), 1);
        // Rejected before the write.
        assert_eq!(f.objects.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_validation_never_touches_storage() {
        let f = fixture(QuotaPolicy::default());
        let user = new_user(&f.store, "ada@example.com").await;

        let mut word = pdf(10);
        word.content_type = "application/msword".to_string();

        let cases = vec![
            UploadRequest { user: user.clone(), name: None, file: Some(pdf(10)) },
            request(&user, "   ", pdf(10)),
            request(&user, "this name is way too long", pdf(10)),
            UploadRequest { user: user.clone(), name: Some("CV".to_string()), file: None },
            request(&user, "CV", word),
            request(&user, "CV", pdf(4 * BYTES_PER_MB + 1)),
            request(&user, "CV", pdf(0)),
        ];

        for case in cases {
            assert!(matches!(f.vault.upload(case).await, Err(Error::Validation(_))));
        }
        assert!(f.objects.is_empty());
        assert_eq!(f.store.ledger_total(&user).await.unwrap(), SizeMb::ZERO);
    }

    #[tokio::test]
    async fn test_upload_accepts_boundaries() {
        let f = fixture(QuotaPolicy::default());
        let user = new_user(&f.store, "ada@example.com").await;

        let mut file = pdf(4 * BYTES_PER_MB);
        file.content_type = "Application/PDF; name=cv.pdf".to_string();

        let resume = f
            .vault
            .upload(request(&user, "  twenty chars exact ", file))
            .await
            .unwrap();
        assert_eq!(resume.filename, "twenty chars exact");
        assert_eq!(resume.size, mb(4));
    }

    /// Commits a competing upload for the same user while the object is
    /// being written, so the pre-check passes but the commit loses.
    struct RacingProvider {
        inner: MemoryProvider,
        store: SqliteStore,
        user: UserId,
    }

    #[async_trait]
    impl StorageProvider for RacingProvider {
        fn name(&self) -> &str {
            "racing"
        }

        async fn put(&self, key: &ObjectKey, data: Bytes, content_type: &str) -> Result<StoredObject> {
            self.store
                .commit_upload(
                    NewResume {
                        user: self.user.clone(),
                        filename: "competitor".to_string(),
                        url: "memory://objects/competitor".to_string(),
                        storage_key: "resumes/competitor.pdf".to_string(),
                        size: mb(10),
                    },
                    mb(20),
                )
                .await?;
            self.inner.put(key, data, content_type).await
        }

        async fn get(&self, key: &ObjectKey) -> Result<Bytes> {
            self.inner.get(key).await
        }

        async fn exists(&self, key: &ObjectKey) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn delete(&self, key: &ObjectKey) -> Result<()> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_commit_rejection_leaves_orphan_and_ledger_intact() {
        let store = SqliteStore::in_memory().unwrap();
        let user = new_user(&store, "ada@example.com").await;
        let provider = Arc::new(RacingProvider {
            inner: MemoryProvider::new(),
            store: store.clone(),
            user: user.clone(),
        });
        let vault = DocumentVault::new(
            Arc::new(store.clone()),
            provider.clone(),
            roomy_policy(),
            fast_retry(),
        );

        let result = vault.upload(request(&user, "Mine", pdf(15 * BYTES_PER_MB))).await;

        match result {
            Err(Error::QuotaExceeded { used, requested, limit }) => {
                assert_eq!(used, mb(10));
                assert_eq!(requested, mb(15));
                assert_eq!(limit, mb(20));
            }
            other => panic!("expected QuotaExceeded, got {:?}", other.map(|r| r.id)),
        }
        assert_eq!(store.ledger_total(&user).await.unwrap(), mb(10));
        assert_eq!(vault.list(&user).await.unwrap().len(), 1);
        // The orphan stays behind.
        assert_eq!(provider.inner.len(), 1);
    }

    /// Fails the first `failures` writes with the given error.
    struct FlakyProvider {
        inner: MemoryProvider,
        failures: u32,
        calls: AtomicU32,
        transient: bool,
    }

    #[async_trait]
    impl StorageProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn put(&self, key: &ObjectKey, data: Bytes, content_type: &str) -> Result<StoredObject> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(if self.transient {
                    Error::Network("connection reset".to_string())
                } else {
                    Error::Storage("access denied".to_string())
                });
            }
            self.inner.put(key, data, content_type).await
        }

        async fn get(&self, key: &ObjectKey) -> Result<Bytes> {
            self.inner.get(key).await
        }

        async fn exists(&self, key: &ObjectKey) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn delete(&self, _key: &ObjectKey) -> Result<()> {
            Err(Error::Storage("delete refused".to_string()))
        }
    }

    fn flaky_vault(store: &SqliteStore, failures: u32, transient: bool) -> (DocumentVault, Arc<FlakyProvider>) {
        let provider = Arc::new(FlakyProvider {
            inner: MemoryProvider::new(),
            failures,
            calls: AtomicU32::new(0),
            transient,
        });
        let vault = DocumentVault::new(
            Arc::new(store.clone()),
            provider.clone(),
            QuotaPolicy::default(),
            fast_retry(),
        );
        (vault, provider)
    }

    #[tokio::test]
    async fn test_transient_storage_failures_are_retried() {
        let store = SqliteStore::in_memory().unwrap();
        let user = new_user(&store, "ada@example.com").await;
        let (vault, provider) = flaky_vault(&store, 2, true);

        vault.upload(request(&user, "CV", pdf(1024))).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_storage_failure_commits_nothing() {
        let store = SqliteStore::in_memory().unwrap();
        let user = new_user(&store, "ada@example.com").await;
        let (vault, provider) = flaky_vault(&store, u32::MAX, false);

        let result = vault.upload(request(&user, "CV", pdf(1024))).await;
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(vault.list(&user).await.unwrap().is_empty());
        assert_eq!(store.ledger_total(&user).await.unwrap(), SizeMb::ZERO);
    }

    #[tokio::test]
    async fn test_delete_survives_storage_failure() {
        let store = SqliteStore::in_memory().unwrap();
        let user = new_user(&store, "ada@example.com").await;
        let (vault, _) = flaky_vault(&store, 0, true);

        let resume = vault.upload(request(&user, "CV", pdf(1024))).await.unwrap();
        vault.delete(&user, resume.id.as_str()).await.unwrap();

        assert!(vault.list(&user).await.unwrap().is_empty());
        assert_eq!(store.ledger_total(&user).await.unwrap(), SizeMb::ZERO);
    }

    #[tokio::test]
    async fn test_delete_refunds_and_removes_object() {
        let f = fixture(roomy_policy());
        let user = new_user(&f.store, "ada@example.com").await;

        let five = f.vault.upload(request(&user, "five", pdf(5 * BYTES_PER_MB))).await.unwrap();
        f.vault.upload(request(&user, "three", pdf(3 * BYTES_PER_MB))).await.unwrap();
        assert_eq!(f.vault.usage(&user).await.unwrap().used_mb, mb(8));

        f.vault.delete(&user, five.id.as_str()).await.unwrap();

        assert_eq!(f.vault.usage(&user).await.unwrap().used_mb, mb(3));
        let remaining = f.vault.list(&user).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].filename, "three");
        settle(&f.objects, 1).await;
    }

    #[tokio::test]
    async fn test_delete_isolation_and_bad_ids() {
        let f = fixture(QuotaPolicy::default());
        let owner = new_user(&f.store, "owner@example.com").await;
        let other = new_user(&f.store, "other@example.com").await;

        let resume = f.vault.upload(request(&owner, "CV", pdf(2048))).await.unwrap();

        assert!(matches!(
            f.vault.delete(&other, resume.id.as_str()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            f.vault.delete(&owner, "not-a-uuid").await,
            Err(Error::NotFound(_))
        ));
        assert_eq!(f.vault.list(&owner).await.unwrap().len(), 1);
        assert_eq!(f.objects.len(), 1);
    }

    #[tokio::test]
    async fn test_usage_report() {
        let f = fixture(roomy_policy());
        let user = new_user(&f.store, "ada@example.com").await;
        f.vault.upload(request(&user, "a", pdf(15 * BYTES_PER_MB))).await.unwrap();

        let usage = f.vault.usage(&user).await.unwrap();
        assert_eq!(usage.percent, 75.0);
        assert!(usage.near_limit);
        assert_eq!(usage.remaining_mb, mb(5));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_respect_cap() {
        let f = fixture(roomy_policy());
        let user = new_user(&f.store, "ada@example.com").await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let vault = f.vault.clone();
            let req = request(&user, &format!("cv {}", i), pdf(3 * BYTES_PER_MB));
            handles.push(tokio::spawn(async move { vault.upload(req).await }));
        }
        for handle in handles {
            let _ = handle.await.unwrap();
        }

        let total = f.store.ledger_total(&user).await.unwrap();
        let listed: SizeMb = f.vault.list(&user).await.unwrap().iter().map(|r| r.size).sum();
        assert!(total <= mb(20));
        assert_eq!(total, listed);
        assert!(!f.store.reconcile_user(&user).await.unwrap().is_drifted());
    }

    /// Takes a while to accept each write.
    struct SlowProvider {
        inner: MemoryProvider,
    }

    #[async_trait]
    impl StorageProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn put(&self, key: &ObjectKey, data: Bytes, content_type: &str) -> Result<StoredObject> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.put(key, data, content_type).await
        }

        async fn get(&self, key: &ObjectKey) -> Result<Bytes> {
            self.inner.get(key).await
        }

        async fn exists(&self, key: &ObjectKey) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn delete(&self, key: &ObjectKey) -> Result<()> {
            self.inner.delete(key).await
        }
    }

    /// Storage whose deletes never finish.
    struct HangingDelete {
        inner: MemoryProvider,
    }

    #[async_trait]
    impl StorageProvider for HangingDelete {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn put(&self, key: &ObjectKey, data: Bytes, content_type: &str) -> Result<StoredObject> {
            self.inner.put(key, data, content_type).await
        }

        async fn get(&self, key: &ObjectKey) -> Result<Bytes> {
            self.inner.get(key).await
        }

        async fn exists(&self, key: &ObjectKey) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn delete(&self, _key: &ObjectKey) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_delete_does_not_wait_for_object_removal() {
        let store = SqliteStore::in_memory().unwrap();
        let user = new_user(&store, "ada@example.com").await;
        let vault = DocumentVault::new(
            Arc::new(store.clone()),
            Arc::new(HangingDelete { inner: MemoryProvider::new() }),
            QuotaPolicy::default(),
            RetryConfig::new(2).with_attempt_timeout(Some(Duration::from_secs(30))),
        );

        let resume = vault.upload(request(&user, "CV", pdf(1024))).await.unwrap();
        let deleted = tokio::time::timeout(
            Duration::from_millis(500),
            vault.delete(&user, resume.id.as_str()),
        )
        .await
        .expect("delete waited on storage cleanup")
        .unwrap();

        assert_eq!(deleted.id, resume.id);
        assert!(vault.list(&user).await.unwrap().is_empty());
        assert_eq!(store.ledger_total(&user).await.unwrap(), SizeMb::ZERO);
    }

    #[tokio::test]
    async fn test_dropped_request_still_commits() {
        let store = SqliteStore::in_memory().unwrap();
        let user = new_user(&store, "ada@example.com").await;
        let vault = DocumentVault::new(
            Arc::new(store.clone()),
            Arc::new(SlowProvider { inner: MemoryProvider::new() }),
            QuotaPolicy::default(),
            fast_retry(),
        );

        let abandoned =
            tokio::time::timeout(Duration::from_millis(5), vault.upload(request(&user, "CV", pdf(1024)))).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(vault.list(&user).await.unwrap().len(), 1);
        assert_eq!(store.ledger_total(&user).await.unwrap(), SizeMb::from_bytes(1024));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Upload(u64),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..=400).prop_map(Op::Upload),
            (0usize..8).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_ledger_matches_resumes(ops in prop::collection::vec(op(), 1..20)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let f = fixture(QuotaPolicy::default());
                let user = new_user(&f.store, "prop@example.com").await;

                for op in ops {
                    match op {
                        Op::Upload(hundredths) => {
                            let bytes = SizeMb::from_hundredths(hundredths).to_bytes();
                            let _ = f.vault.upload(request(&user, "p", pdf(bytes))).await;
                        }
                        Op::Delete(index) => {
                            let resumes = f.vault.list(&user).await.unwrap();
                            if let Some(resume) = resumes.get(index) {
                                f.vault.delete(&user, resume.id.as_str()).await.unwrap();
                            }
                        }
                    }

                    let total = f.store.ledger_total(&user).await.unwrap();
                    let listed: SizeMb = f.vault.list(&user).await.unwrap().iter().map(|r| r.size).sum();
                    assert_eq!(total, listed);
                    assert!(total <= mb(20));
                }
            });
        }
    }
}
