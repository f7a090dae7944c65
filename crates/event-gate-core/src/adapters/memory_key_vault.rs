//! # In-Memory Key Vault Implementation
//!
//! Thread-safe in-memory secret store for testing and development.
//! Keeps every version of a secret and always serves the latest one.

use crate::key_vault::{KeyVaultError, KeyVaultProvider, SecretName, SecretValue};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock, RwLockWriteGuard,
    },
};
use tracing::instrument;

/// Secret name to its versions, oldest first
type SecretVersions = HashMap<SecretName, Vec<SecretValue>>;

/// In-memory secret store with version history
///
/// Clones share the same storage, so a test can keep a handle to rotate
/// secrets or count lookups after handing the provider to a resolver.
#[derive(Clone, Default)]
pub struct InMemoryKeyVaultProvider {
    secrets: Arc<RwLock<SecretVersions>>,
    requests: Arc<AtomicU64>,
}

impl InMemoryKeyVaultProvider {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one version of each given secret
    pub fn with_secrets(secrets: HashMap<SecretName, SecretValue>) -> Self {
        let versions = secrets
            .into_iter()
            .map(|(name, value)| (name, vec![value]))
            .collect();
        Self {
            secrets: Arc::new(RwLock::new(versions)),
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace all versions of a secret with a single value
    pub fn add_secret(&self, name: SecretName, value: SecretValue) -> Result<(), KeyVaultError> {
        self.write()?.insert(name, vec![value]);
        Ok(())
    }

    /// Add a new latest version, keeping older ones
    pub fn add_version(&self, name: SecretName, value: SecretValue) -> Result<(), KeyVaultError> {
        self.write()?.entry(name).or_default().push(value);
        Ok(())
    }

    /// Remove a secret and all its versions
    pub fn remove_secret(&self, name: &SecretName) -> Result<(), KeyVaultError> {
        self.write()?.remove(name);
        Ok(())
    }

    /// Number of versions stored for a secret
    pub fn version_count(&self, name: &SecretName) -> usize {
        self.secrets
            .read()
            .map(|secrets| secrets.get(name).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Number of `get_secret` calls served so far
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SecretVersions>, KeyVaultError> {
        self.secrets.write().map_err(|_| KeyVaultError::Internal {
            message: "in-memory secret store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl KeyVaultProvider for InMemoryKeyVaultProvider {
    #[instrument(skip(self))]
    async fn get_secret(&self, name: &SecretName) -> Result<SecretValue, KeyVaultError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let secrets = self.secrets.read().map_err(|_| KeyVaultError::Internal {
            message: "in-memory secret store lock poisoned".to_string(),
        })?;

        secrets
            .get(name)
            .and_then(|versions| versions.last())
            .cloned()
            .ok_or_else(|| KeyVaultError::SecretNotFound { name: name.clone() })
    }
}

impl std::fmt::Debug for InMemoryKeyVaultProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyVaultProvider")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "memory_key_vault_tests.rs"]
mod tests;
