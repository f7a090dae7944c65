//! # Webhook Module
//!
//! Request model and verification pipeline for inbound webhooks.
//!
//! - [`source`]: classify a header set into a provider
//! - [`strategy`]: the signing schemes providers use
//! - [`contract`]: which credential and scheme each provider uses
//! - [`dispatcher`]: turn a request into an accept/reject verdict

use crate::{key_vault::KeyVaultError, SecretName, Timestamp};
use bytes::Bytes;

pub mod contract;
pub mod dispatcher;
pub mod source;
pub mod strategy;

// ============================================================================
// Core Types
// ============================================================================

/// Header set of an inbound request.
///
/// Keeps every `(name, value)` pair in the order received, including
/// repeated names. Lookups compare names ASCII-case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    entries: Vec<(String, String)>,
}

impl WebhookHeaders {
    /// Create an empty header set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any existing values with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Get the first value of a header
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get all values of a header in received order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check whether a header is present, regardless of its value
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Iterate over all headers in received order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no headers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for WebhookHeaders
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

/// Raw inbound webhook, as handed over by the HTTP layer
#[derive(Debug, Clone)]
pub struct IncomingWebhook {
    pub headers: WebhookHeaders,

    /// Unmodified request body. Signatures are computed over these exact bytes.
    pub body: Bytes,

    /// Value of the `team` query parameter
    pub team: Option<String>,

    /// Value of the `token` query parameter
    pub token: Option<String>,

    pub received_at: Timestamp,
}

impl IncomingWebhook {
    /// Create new webhook request without query parameters
    pub fn new(headers: WebhookHeaders, body: Bytes) -> Self {
        Self {
            headers,
            body,
            team: None,
            token: None,
            received_at: Timestamp::now(),
        }
    }

    /// Set the `team` query parameter. An empty value means no team.
    pub fn with_team(mut self, team: Option<String>) -> Self {
        self.team = team.filter(|t| !t.is_empty());
        self
    }

    /// Set the `token` query parameter
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Get the `User-Agent` header if present
    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get("User-Agent")
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Reasons a webhook fails verification
///
/// Every variant ends in a rejection. The variant is kept for logs and
/// metrics only; callers outside the gateway see the same forbidden
/// response for all of them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VerificationError {
    #[error("unauthorized source")]
    UnknownSource { user_agent: Option<String> },

    #[error("Secret not found: {name}")]
    SecretNotFound { name: SecretName },

    #[error("Secret unavailable: {message}")]
    SecretUnavailable { message: String },

    #[error("Malformed credential: {reason}")]
    MalformedCredential { reason: String },

    #[error("Credential does not match for provider {provider}")]
    VerificationMismatch { provider: String },

    #[error("Invalid team: {reason}")]
    InvalidTeam { reason: String },
}

impl VerificationError {
    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownSource { .. } => "unknown_source",
            Self::SecretNotFound { .. } => "secret_not_found",
            Self::SecretUnavailable { .. } => "secret_unavailable",
            Self::MalformedCredential { .. } => "malformed_credential",
            Self::VerificationMismatch { .. } => "verification_mismatch",
            Self::InvalidTeam { .. } => "invalid_team",
        }
    }

    /// Build a `MalformedCredential` error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedCredential {
            reason: reason.into(),
        }
    }
}

impl From<KeyVaultError> for VerificationError {
    fn from(error: KeyVaultError) -> Self {
        match error {
            KeyVaultError::SecretNotFound { name } => Self::SecretNotFound { name },
            other => Self::SecretUnavailable {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
