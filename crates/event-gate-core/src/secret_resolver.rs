//! Tenant secret resolution.
//!
//! [`SecretResolver`] maps an optional [`TeamId`] to the secret that signs
//! that team's webhooks. The lookup key is `<base-name>` for the default
//! tenant and `<base-name>-<team>` otherwise; the latest version is always
//! fetched so rotated secrets apply immediately.

use crate::{
    key_vault::{KeyVaultError, KeyVaultProvider, SecretName, SecretValue},
    TeamId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default base name of the gateway's webhook secrets.
pub const DEFAULT_BASE_SECRET_NAME: &str = "event-handler";

/// Process-wide settings for secret resolution.
///
/// Passed to [`SecretResolver::new`] explicitly instead of being read from
/// the environment, so tests can construct resolvers freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretResolverConfig {
    /// Project that owns the secrets. Used for diagnostics only; the
    /// [`KeyVaultProvider`] is already bound to its project.
    pub project_name: String,

    /// Base secret name, suffixed with `-<team>` for non-default tenants.
    #[serde(default = "default_base_secret_name")]
    pub base_secret_name: String,
}

fn default_base_secret_name() -> String {
    DEFAULT_BASE_SECRET_NAME.to_string()
}

impl SecretResolverConfig {
    /// Create a configuration using the default base secret name.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            base_secret_name: default_base_secret_name(),
        }
    }

    /// Override the base secret name.
    pub fn with_base_secret_name(mut self, base_secret_name: impl Into<String>) -> Self {
        self.base_secret_name = base_secret_name.into();
        self
    }
}

/// Resolves the current secret for a tenant.
///
/// Holds no per-request state and can be shared freely between tasks.
#[derive(Clone)]
pub struct SecretResolver {
    config: SecretResolverConfig,
    provider: Arc<dyn KeyVaultProvider>,
}

impl SecretResolver {
    /// Create a resolver backed by the given secret store.
    pub fn new(config: SecretResolverConfig, provider: Arc<dyn KeyVaultProvider>) -> Self {
        Self { config, provider }
    }

    /// Get the resolver configuration
    pub fn config(&self) -> &SecretResolverConfig {
        &self.config
    }

    /// Build the secret name for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError::InvalidSecretName`] when the configured base
    /// name combined with the team is not a valid secret name.
    pub fn secret_name_for(&self, team: Option<&TeamId>) -> Result<SecretName, KeyVaultError> {
        match team {
            None => SecretName::new(self.config.base_secret_name.as_str()),
            Some(team) => SecretName::new(format!(
                "{}-{}",
                self.config.base_secret_name,
                team.as_str()
            )),
        }
    }

    /// Fetch the latest secret for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`KeyVaultError::SecretNotFound`] for an unknown tenant and any
    /// store error unchanged. Callers turn every error into a rejection.
    #[instrument(skip_all, fields(team = TeamId::label(team), project = %self.config.project_name))]
    pub async fn resolve(&self, team: Option<&TeamId>) -> Result<SecretValue, KeyVaultError> {
        let name = self.secret_name_for(team)?;

        match self.provider.get_secret(&name).await {
            Ok(secret) => {
                debug!(secret_name = %name, secret_len = secret.len(), "Resolved webhook secret");
                Ok(secret)
            }
            Err(e) => {
                warn!(secret_name = %name, error = %e, "Failed to resolve webhook secret");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "secret_resolver_tests.rs"]
mod tests;
