//! # Forwarding Module
//!
//! Boundary to the downstream message queue.
//!
//! Only verified webhooks are forwarded. Each accepted request is published
//! exactly once; retry and backoff belong to the queue client, not the
//! gateway.

use crate::{
    webhook::{source::EventSource, IncomingWebhook},
    TeamId, Timestamp,
};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the tenant on forwarded events
pub const TEAM_HEADER: &str = "X-Team";

// ============================================================================
// Core Types
// ============================================================================

/// Identifier assigned by the queue to a published message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verified webhook as handed to the queue
///
/// The body is passed through unmodified. Headers keep their received
/// order with names in `Train-Case`, followed by [`TEAM_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedEvent {
    pub source: EventSource,
    pub body: Bytes,
    pub headers: Vec<(String, String)>,
    pub team: String,
    pub received_at: Timestamp,
}

impl ForwardedEvent {
    /// Build the forwarded event for a request that passed verification.
    ///
    /// A client-supplied `X-Team` header is replaced by the team the request
    /// was verified for, so the tenant cannot be spoofed downstream.
    pub fn from_verified(request: &IncomingWebhook, source: EventSource) -> Self {
        let team = request
            .team
            .as_deref()
            .unwrap_or(TeamId::DEFAULT_LABEL)
            .to_string();

        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(TEAM_HEADER))
            .map(|(name, value)| (train_case(name), value.to_string()))
            .collect();
        headers.push((TEAM_HEADER.to_string(), team.clone()));

        Self {
            source,
            body: request.body.clone(),
            headers,
            team,
            received_at: request.received_at,
        }
    }

    /// Get the first value of a forwarded header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Headers as a JSON object. Later duplicates overwrite earlier ones.
    pub fn headers_json(&self) -> Result<String, PublishError> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .headers
            .iter()
            .map(|(n, v)| (n.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::to_string(&map).map_err(|e| PublishError::Serialization {
            message: e.to_string(),
        })
    }
}

/// Canonicalise a header name: `x-gitlab-token` becomes `X-Gitlab-Token`.
pub fn train_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_ascii_uppercase()
                    .to_string()
                    + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

// ============================================================================
// Interface Traits
// ============================================================================

/// Interface for publishing verified events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event
    ///
    /// # Errors
    /// - `PublishError::Unavailable` - Queue unreachable or failing
    /// - `PublishError::Rejected` - Queue refused the message
    /// - `PublishError::Timeout` - Queue did not answer in time
    /// - `PublishError::Serialization` - Event could not be encoded
    async fn publish(&self, event: &ForwardedEvent) -> Result<MessageId, PublishError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while publishing
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    #[error("Queue unavailable: {message}")]
    Unavailable { message: String },

    #[error("Message rejected by queue: {message}")]
    Rejected { message: String },

    #[error("Publish timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },
}

impl PublishError {
    /// Check if error is transient and a later attempt could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PublishError::Unavailable { .. } | PublishError::Timeout { .. }
        )
    }
}

#[cfg(test)]
#[path = "forwarding_tests.rs"]
mod tests;
