//! # Key Vault Module
//!
//! Boundary to the external, versioned secret store.
//!
//! The gateway only ever reads the *latest* version of a secret and never
//! caches it across requests, so a rotated secret takes effect on the next
//! webhook. Secret bytes live in a zeroizing buffer and are redacted from
//! `Debug` output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use zeroize::Zeroizing;

// ============================================================================
// Core Types
// ============================================================================

/// Secret identifier with naming convention validation
///
/// Secret names are built as `<base-name>` or `<base-name>-<team>`, see
/// [`SecretResolver`](crate::secret_resolver::SecretResolver).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretName(String);

impl SecretName {
    /// Maximum secret name length accepted by the secret store.
    pub const MAX_LENGTH: usize = 255;

    /// Create new secret name with validation
    ///
    /// # Validation Rules
    /// - Must be 1-255 characters
    /// - Must contain only ASCII alphanumeric characters, hyphens and underscores
    pub fn new(name: impl Into<String>) -> Result<Self, KeyVaultError> {
        let name = name.into();

        if name.is_empty() {
            return Err(KeyVaultError::InvalidSecretName {
                name: name.clone(),
                reason: "Secret name cannot be empty".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(KeyVaultError::InvalidSecretName {
                name: name.clone(),
                reason: format!(
                    "Secret name exceeds {} character limit",
                    Self::MAX_LENGTH
                ),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(KeyVaultError::InvalidSecretName {
                name: name.clone(),
                reason: "Secret name contains invalid characters".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SecretName {
    type Err = KeyVaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Secure container for secret values
///
/// The bytes are wiped when the value is dropped. Secret values are never
/// included in Debug output or logs.
#[derive(Clone)]
pub struct SecretValue {
    inner: Zeroizing<Vec<u8>>,
}

impl SecretValue {
    /// Create secret value from raw bytes
    pub fn from_bytes(value: Vec<u8>) -> Self {
        Self {
            inner: Zeroizing::new(value),
        }
    }

    /// Create secret value from string
    pub fn from_string(value: String) -> Self {
        Self::from_bytes(value.into_bytes())
    }

    /// Get secret as bytes (only for immediate use)
    pub fn expose_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Get secret decoded as UTF-8, if it is valid UTF-8
    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.inner).ok()
    }

    /// Check if secret is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get secret length without exposing content
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Interface Traits
// ============================================================================

/// Interface for read access to the secret store
///
/// Implementations must be safe for concurrent use; the dispatcher calls
/// them from many requests at once. Connection pooling is the
/// implementation's concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyVaultProvider: Send + Sync {
    /// Get the latest version of a secret
    ///
    /// # Errors
    /// - `KeyVaultError::SecretNotFound` - Secret doesn't exist
    /// - `KeyVaultError::AccessDenied` - Insufficient permissions
    /// - `KeyVaultError::ServiceUnavailable` - Secret store unreachable
    /// - `KeyVaultError::Timeout` - Secret store did not answer in time
    async fn get_secret(&self, name: &SecretName) -> Result<SecretValue, KeyVaultError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during Key Vault operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyVaultError {
    #[error("Secret not found: {name}")]
    SecretNotFound { name: SecretName },

    #[error("Access denied to secret: {name} - {reason}")]
    AccessDenied { name: SecretName, reason: String },

    #[error("Key Vault service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Invalid secret name: {name} - {reason}")]
    InvalidSecretName { name: String, reason: String },

    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Rate limit exceeded: {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl KeyVaultError {
    /// Check if error is transient and could succeed on a later request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            KeyVaultError::ServiceUnavailable { .. }
                | KeyVaultError::Timeout { .. }
                | KeyVaultError::RateLimitExceeded { .. }
                | KeyVaultError::Internal { .. }
        )
    }

    /// Build a timeout error from the elapsed limit
    pub fn timeout(limit: Duration) -> Self {
        KeyVaultError::Timeout {
            timeout_seconds: limit.as_secs(),
        }
    }
}

#[cfg(test)]
#[path = "key_vault_tests.rs"]
mod tests;
