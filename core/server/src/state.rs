//! Shared handler state.

use axum::http::HeaderValue;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::{ServerConfig, StorageBackend};
use resumevault_common::{Error, Result};
use resumevault_crypto::{KdfParams, SigningKey};
use resumevault_identity::{CredentialVerifier, FederatedProvider, GoogleOAuth, SessionIssuer};
use resumevault_storage::{create_default_registry, RetryConfig, StorageProvider};
use resumevault_store::SqliteStore;
use resumevault_vault::{DocumentVault, QuotaPolicy};

/// Everything the handlers need. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub verifier: CredentialVerifier,
    pub sessions: SessionIssuer,
    pub vault: DocumentVault,
    pub google: Option<Arc<dyn FederatedProvider>>,
    pub frontend_url: String,
    pub cors_origin: HeaderValue,
    /// Mark cookies `Secure` when the API is served over HTTPS.
    pub secure_cookies: bool,
    /// Directory served at `/files`, when objects live on local disk.
    pub files_root: Option<PathBuf>,
}

impl AppState {
    /// Open the store and storage backend named by `config`.
    ///
    /// # Errors
    /// - `Database` if the store cannot be opened
    /// - `Configuration` for an unusable secret, origin, or provider setting
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.database_url)?;

        let registry = create_default_registry()?;
        let provider =
            registry.resolve(config.storage_backend.as_str(), config.provider_config())?;
        info!(backend = provider.name(), "Storage provider ready");

        let google = match config.google.clone() {
            Some(google) => Some(Arc::new(GoogleOAuth::new(google)?) as Arc<dyn FederatedProvider>),
            None => None,
        };

        Self::new(config, store, provider, google, KdfParams::default())
    }

    /// Assemble state from already-built parts.
    pub fn new(
        config: &ServerConfig,
        store: SqliteStore,
        provider: Arc<dyn StorageProvider>,
        google: Option<Arc<dyn FederatedProvider>>,
        kdf: KdfParams,
    ) -> Result<Self> {
        let key = SigningKey::new(config.jwt_secret.expose().as_bytes())?;
        let cors_origin = HeaderValue::from_str(&config.frontend_url)
            .map_err(|e| Error::Configuration(format!("Invalid FRONTEND_URL: {}", e)))?;

        let retry = RetryConfig::new(config.storage_max_retries)
            .with_attempt_timeout(Some(config.storage_timeout));
        let policy = QuotaPolicy::new(config.quota_limit, config.max_file_bytes);
        let store = Arc::new(store);

        Ok(Self {
            verifier: CredentialVerifier::new(store.clone(), kdf),
            sessions: SessionIssuer::new(&key),
            vault: DocumentVault::new(store, provider, policy, retry),
            google,
            frontend_url: config.frontend_url.clone(),
            cors_origin,
            secure_cookies: config.public_url.starts_with("https://"),
            files_root: match config.storage_backend {
                StorageBackend::Local => Some(config.storage_root.clone()),
                StorageBackend::Memory => None,
            },
        })
    }
}
