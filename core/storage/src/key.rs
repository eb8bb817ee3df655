//! Object keys within a storage bucket.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use resumevault_common::{Error, Result, UserId};

/// A `/`-separated key naming one stored object, independent of backend.
///
/// Components are validated so a key can never escape the storage root
/// of a filesystem-backed provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    components: Vec<String>,
}

impl ObjectKey {
    /// Create a key from string components.
    ///
    /// # Errors
    /// - Returns error if there are no components, or any component is
    ///   empty, `.`/`..`, or contains a separator
    pub fn from_components(components: Vec<String>) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::Validation("Object key cannot be empty".to_string()));
        }
        for comp in &components {
            if comp.is_empty() || comp == "." || comp == ".." {
                return Err(Error::Validation(format!(
                    "Invalid object key component: {:?}",
                    comp
                )));
            }
            if comp.contains('/') || comp.contains('\\') {
                return Err(Error::Validation(
                    "Object key component cannot contain separators".to_string(),
                ));
            }
        }
        Ok(Self { components })
    }

    /// Parse a key string. Leading and trailing `/` are ignored.
    pub fn parse(key: &str) -> Result<Self> {
        let trimmed = key.trim_matches('/');
        let components = trimmed.split('/').map(String::from).collect();
        Self::from_components(components)
    }

    /// Fresh key for a resume upload: `resumes/<user>/<uuid>.pdf`.
    pub fn for_resume(owner: &UserId) -> Self {
        Self {
            components: vec![
                "resumes".to_string(),
                owner.as_str().to_string(),
                format!("{}.pdf", Uuid::new_v4()),
            ],
        }
    }

    /// Last component.
    pub fn name(&self) -> &str {
        self.components
            .last()
            .map(|s| s.as_str())
            .unwrap_or_default()
    }

    /// All components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Canonical string form without a leading slash.
    pub fn as_string(&self) -> String {
        self.components.join("/")
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}
