//! Server configuration from environment variables.

use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use resumevault_common::{Error, Result, SecretString, SizeMb};
use resumevault_identity::GoogleConfig;
use resumevault_vault::{DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_QUOTA_LIMIT_MB};

/// Where uploaded objects are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Files under `STORAGE_ROOT`, served back at `/files`.
    Local,
    /// Process memory; lost on restart.
    Memory,
}

impl StorageBackend {
    /// Registry name of the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::Memory => "memory",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(Error::Configuration(format!(
                "STORAGE_BACKEND must be 'local' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// SQLite path, or `:memory:`.
    pub database_url: String,
    pub jwt_secret: SecretString,
    /// Browser origin allowed by CORS and target of OAuth redirects.
    pub frontend_url: String,
    /// Externally visible base URL of this server.
    pub public_url: String,
    pub storage_backend: StorageBackend,
    pub storage_root: PathBuf,
    pub quota_limit: SizeMb,
    pub max_file_bytes: u64,
    pub storage_timeout: Duration,
    pub storage_max_retries: u32,
    /// Google federation; `None` disables the Google routes.
    pub google: Option<GoogleConfig>,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// - `Configuration` if `JWT_SECRET` is missing or any value is malformed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET")
            .map(SecretString::new)
            .ok_or_else(|| Error::Configuration("JWT_SECRET must be set".to_string()))?;

        let public_url = get("PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:5000".to_string())
            .trim_end_matches('/')
            .to_string();

        let google = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(secret)) => Some(GoogleConfig {
                client_id,
                client_secret: SecretString::new(secret),
                redirect_url: get("GOOGLE_CALLBACK_URL")
                    .unwrap_or_else(|| format!("{}/auth/google/callback", public_url)),
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Configuration(
                    "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set together".to_string(),
                ))
            }
        };

        let max_file_size: SizeMb = parse(&get, "MAX_FILE_SIZE_MB", SizeMb::from_whole_mb(DEFAULT_MAX_FILE_SIZE_MB))?;

        Ok(Self {
            bind_addr: parse(&get, "BIND_ADDR", IpAddr::from([0, 0, 0, 0]))?,
            port: parse(&get, "PORT", 5000)?,
            database_url: get("DATABASE_URL").unwrap_or_else(|| "resumevault.db".to_string()),
            jwt_secret,
            frontend_url: get("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string())
                .trim_end_matches('/')
                .to_string(),
            public_url,
            storage_backend: parse(&get, "STORAGE_BACKEND", StorageBackend::Local)?,
            storage_root: get("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            quota_limit: parse(&get, "QUOTA_LIMIT_MB", SizeMb::from_whole_mb(DEFAULT_QUOTA_LIMIT_MB))?,
            max_file_bytes: max_file_size.to_bytes(),
            storage_timeout: Duration::from_secs(parse(&get, "STORAGE_TIMEOUT_SECS", 30)?),
            storage_max_retries: parse(&get, "STORAGE_MAX_RETRIES", 2)?,
            google,
        })
    }

    /// Address to listen on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Base URL stored objects are reachable under.
    pub fn files_base_url(&self) -> String {
        format!("{}/files", self.public_url)
    }

    /// Provider configuration for the storage registry.
    pub fn provider_config(&self) -> Value {
        match self.storage_backend {
            StorageBackend::Local => json!({
                "root": self.storage_root.to_string_lossy(),
                "base_url": self.files_base_url(),
            }),
            StorageBackend::Memory => json!({ "base_url": self.files_base_url() }),
        }
    }
}

fn parse<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("JWT_SECRET", "0123456789abcdef")]).unwrap();

        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(cfg.database_url, "resumevault.db");
        assert_eq!(cfg.frontend_url, "http://localhost:5173");
        assert_eq!(cfg.storage_backend, StorageBackend::Local);
        assert_eq!(cfg.quota_limit, SizeMb::from_whole_mb(20));
        assert_eq!(cfg.max_file_bytes, 4 * 1024 * 1024);
        assert_eq!(cfg.storage_timeout, Duration::from_secs(30));
        assert_eq!(cfg.storage_max_retries, 2);
        assert!(cfg.google.is_none());
        assert_eq!(cfg.files_base_url(), "http://localhost:5000/files");
    }

    #[test]
    fn test_jwt_secret_required() {
        assert!(matches!(config(&[]), Err(Error::Configuration(_))));
        assert!(matches!(
            config(&[("JWT_SECRET", "   ")]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("JWT_SECRET", "0123456789abcdef"),
            ("PORT", "8080"),
            ("PUBLIC_URL", "https://api.example.com/"),
            ("STORAGE_BACKEND", "Memory"),
            ("QUOTA_LIMIT_MB", "50.5"),
            ("MAX_FILE_SIZE_MB", "10"),
        ])
        .unwrap();

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.public_url, "https://api.example.com");
        assert_eq!(cfg.storage_backend, StorageBackend::Memory);
        assert_eq!(cfg.quota_limit, SizeMb::from_hundredths(5050));
        assert_eq!(cfg.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.provider_config()["base_url"], "https://api.example.com/files");
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("PORT", "eighty"),
            ("STORAGE_BACKEND", "s3"),
            ("QUOTA_LIMIT_MB", "-1"),
            ("BIND_ADDR", "localhost:1"),
        ] {
            let result = config(&[("JWT_SECRET", "0123456789abcdef"), (key, value)]);
            assert!(matches!(result, Err(Error::Configuration(_))), "{}", key);
        }
    }

    #[test]
    fn test_google_settings() {
        let cfg = config(&[
            ("JWT_SECRET", "0123456789abcdef"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ])
        .unwrap();
        let google = cfg.google.unwrap();
        assert_eq!(google.redirect_url, "http://localhost:5000/auth/google/callback");

        let half = config(&[("JWT_SECRET", "0123456789abcdef"), ("GOOGLE_CLIENT_ID", "id")]);
        assert!(matches!(half, Err(Error::Configuration(_))));
    }
}
