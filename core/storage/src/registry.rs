//! Storage backend selection by name.
//!
//! The server names its backend in configuration (`local` or `memory`)
//! together with a JSON blob of backend settings; the registry turns that
//! pair into a ready provider.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::local::LocalProvider;
use crate::memory::MemoryProvider;
use crate::provider::StorageProvider;
use resumevault_common::{Error, Result};

/// Builds a provider from its JSON settings.
pub type ProviderFactory = Box<dyn Fn(Value) -> Result<Arc<dyn StorageProvider>> + Send + Sync>;

/// Named provider factories.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory under `name`.
    ///
    /// # Errors
    /// - `Configuration` if `name` is taken
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::Configuration(format!(
                "Storage provider '{}' registered twice",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Build the provider registered as `name` from `settings`.
    ///
    /// # Errors
    /// - `Configuration` for an unknown name or unusable settings
    pub fn resolve(&self, name: &str, settings: Value) -> Result<Arc<dyn StorageProvider>> {
        match self.factories.get(name) {
            Some(factory) => factory(settings),
            None => Err(Error::Configuration(format!(
                "Unknown storage provider '{}' (available: {})",
                name,
                self.providers().join(", ")
            ))),
        }
    }

    /// Registered names, sorted.
    pub fn providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

fn required_str<'a>(settings: &'a Value, key: &str, provider: &str) -> Result<&'a str> {
    settings.get(key).and_then(Value::as_str).ok_or_else(|| {
        Error::Configuration(format!("'{}' storage needs a '{}' setting", provider, key))
    })
}

/// Registry with the built-in backends.
///
/// - `memory`: optional `base_url`
/// - `local`: required `root` and `base_url`
pub fn create_default_registry() -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    registry.register(
        "memory",
        Box::new(|settings| {
            let provider = settings
                .get("base_url")
                .and_then(Value::as_str)
                .map(MemoryProvider::with_base_url)
                .unwrap_or_default();
            Ok(Arc::new(provider))
        }),
    )?;

    registry.register(
        "local",
        Box::new(|settings| {
            let root = required_str(&settings, "root", "local")?;
            let base_url = required_str(&settings, "base_url", "local")?;
            Ok(Arc::new(LocalProvider::new(root, base_url)?))
        }),
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_custom_factory_resolves() {
        let mut registry = ProviderRegistry::new();
        registry
            .register("scratch", Box::new(|_| Ok(Arc::new(MemoryProvider::new()))))
            .unwrap();

        let provider = registry.resolve("scratch", Value::Null).unwrap();
        assert_eq!(provider.name(), "memory");
    }

    #[test]
    fn test_name_cannot_be_registered_twice() {
        let mut registry = create_default_registry().unwrap();
        let again = registry.register("memory", Box::new(|_| Ok(Arc::new(MemoryProvider::new()))));
        assert!(matches!(again, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_unknown_backend_lists_available() {
        let registry = create_default_registry().unwrap();
        assert_eq!(registry.providers(), vec!["local", "memory"]);

        match registry.resolve("s3", Value::Null) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("local, memory")),
            other => panic!("expected configuration error, got {:?}", other.map(|p| p.name().to_string())),
        }
    }

    #[test]
    fn test_local_requires_root() {
        let registry = create_default_registry().unwrap();
        let result = registry.resolve("local", json!({ "base_url": "http://x" }));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_local_resolves_with_settings() {
        let temp = tempfile::TempDir::new().unwrap();
        let registry = create_default_registry().unwrap();
        let provider = registry
            .resolve(
                "local",
                json!({ "root": temp.path().to_string_lossy(), "base_url": "http://x/files" }),
            )
            .unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_memory_without_settings() {
        let registry = create_default_registry().unwrap();
        assert!(registry.resolve("memory", json!({})).is_ok());
    }
}
