//! API key validation

use std::collections::HashSet;
use toxiguard_core::ApiKey;

/// Immutable set of valid API keys.
///
/// Lookups are exact, case-sensitive hash-set membership tests. Empty keys
/// are dropped at construction and can never validate.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    keys: HashSet<ApiKey>,
}

impl CredentialStore {
    /// Create a store from the configured keys
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty())
                .map(ApiKey::new)
                .collect(),
        }
    }

    /// Check a presented key. Absent, empty and unknown keys all fail.
    pub fn validate(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(key) if !key.is_empty() => self.keys.contains(key),
            _ => false,
        }
    }

    /// Number of configured keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are configured (every request is then unauthorized)
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
