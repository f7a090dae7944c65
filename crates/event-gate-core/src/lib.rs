//! # Event-Gate Core
//!
//! Core trust boundary for the Event-Gate webhook ingestion gateway.
//!
//! This crate decides whether an inbound webhook is authentic. It identifies
//! the sending provider from the request headers, resolves the tenant secret,
//! runs the provider's signing scheme and produces a single accept/reject
//! verdict. Only accepted requests are handed to the downstream queue.
//!
//! ## Architecture
//!
//! - [`webhook::source`] classifies a header set into an [`EventSource`]
//! - [`webhook::contract`] maps every source to its credential location and
//!   [`VerificationStrategy`]
//! - [`secret_resolver`] turns an optional team into the current secret
//! - [`webhook::dispatcher`] orchestrates the above and fails closed
//! - [`key_vault`] and [`forwarding`] are the boundaries to the external
//!   secret store and message queue; [`adapters`] holds their implementations
//!
//! ## Usage
//!
//! ```rust
//! use event_gate_core::TeamId;
//!
//! let team = TeamId::new("team1").unwrap();
//! assert_eq!(team.as_str(), "team1");
//! assert!(TeamId::new("../etc").is_err());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Tenant Types
// ============================================================================

/// Tenant identifier taken from the `team` query parameter.
///
/// A team is an opaque name, but it is embedded in the secret lookup key so
/// it is limited to characters that are valid in a secret name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(String);

impl TeamId {
    /// Maximum accepted length of a team identifier.
    pub const MAX_LENGTH: usize = 64;

    /// Label used for requests that carry no team.
    pub const DEFAULT_LABEL: &'static str = "default";

    /// Create a new team identifier with validation
    ///
    /// # Validation Rules
    /// - Must be 1-64 characters
    /// - Must contain only ASCII alphanumeric characters, hyphens and underscores
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "team".to_string(),
            });
        }

        if value.len() > Self::MAX_LENGTH {
            return Err(ValidationError::TooLong {
                field: "team".to_string(),
                max_length: Self::MAX_LENGTH,
            });
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidCharacters {
                field: "team".to_string(),
                invalid_chars: "only [A-Za-z0-9_-] allowed".to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label a possibly absent team, using `"default"` when absent.
    pub fn label(team: Option<&TeamId>) -> &str {
        team.map(TeamId::as_str).unwrap_or(Self::DEFAULT_LABEL)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TeamId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// Time and Metadata Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    TooLong { field: String, max_length: usize },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Webhook request model, source identification and verification
pub mod webhook;

/// Key Vault module for secret store access
pub mod key_vault;

/// Tenant secret resolution
pub mod secret_resolver;

/// Forwarding of verified events to the downstream queue
pub mod forwarding;

/// Infrastructure adapters for the secret store and queue boundaries
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{
    InMemoryEventPublisher, InMemoryKeyVaultProvider, PubSubConfig, PubSubEventPublisher,
    SecretManagerConfig, SecretManagerKeyVaultProvider,
};
pub use forwarding::{EventPublisher, ForwardedEvent, MessageId, PublishError};
pub use key_vault::{KeyVaultError, KeyVaultProvider, SecretName, SecretValue};
pub use secret_resolver::{SecretResolver, SecretResolverConfig};
pub use webhook::{
    contract::{CredentialLocation, EventSourceContract},
    dispatcher::{VerificationDispatcher, VerificationVerdict},
    source::{identify, EventSource, SourceIdentity},
    strategy::VerificationStrategy,
    IncomingWebhook, VerificationError, WebhookHeaders,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
