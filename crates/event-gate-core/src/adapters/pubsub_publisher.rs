//! # Pub/Sub Publisher
//!
//! Publishes verified events to a Google Pub/Sub compatible topic over REST:
//!
//! ```text
//! POST {base_url}/v1/projects/{project}/topics/{topic}:publish
//! {"messages":[{"data":"<base64 body>","attributes":{"source":"github","headers":"{...}"}}]}
//! ```
//!
//! The topic defaults to the provider name (`github`, `gitlab`, ...) unless a
//! fixed topic is configured. One request per event and no retries; the
//! caller reports failures.

use crate::forwarding::{EventPublisher, ForwardedEvent, MessageId, PublishError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};
use tracing::{info, instrument, warn};
use url::Url;

/// Default API endpoint
pub const DEFAULT_PUBSUB_URL: &str = "https://pubsub.googleapis.com";

/// Connection settings for [`PubSubEventPublisher`]
#[derive(Clone)]
pub struct PubSubConfig {
    pub project: String,

    /// Fixed topic for all events. `None` publishes to a topic named after the provider.
    pub topic: Option<String>,

    pub base_url: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl PubSubConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            topic: None,
            base_url: DEFAULT_PUBSUB_URL.to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.topic = topic;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for PubSubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubConfig")
            .field("project", &self.project)
            .field("topic", &self.topic)
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct PublishRequest {
    messages: Vec<PubSubMessage>,
}

#[derive(Serialize)]
struct PubSubMessage {
    data: String,
    attributes: BTreeMap<&'static str, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// Event publisher backed by the Pub/Sub REST API
#[derive(Debug, Clone)]
pub struct PubSubEventPublisher {
    config: PubSubConfig,
    http_client: reqwest::Client,
}

impl PubSubEventPublisher {
    /// Create a new publisher
    ///
    /// # Errors
    /// Returns `PublishError::Unavailable` if the project or a configured
    /// topic is empty, the base URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(config: PubSubConfig) -> Result<Self, PublishError> {
        if config.project.trim().is_empty() {
            return Err(PublishError::Unavailable {
                message: "project is required".to_string(),
            });
        }

        if config.topic.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(PublishError::Unavailable {
                message: "topic must not be empty when set".to_string(),
            });
        }

        Url::parse(&config.base_url).map_err(|e| PublishError::Unavailable {
            message: format!("invalid base_url '{}': {}", config.base_url, e),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PublishError::Unavailable {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn topic_for<'a>(&'a self, event: &ForwardedEvent) -> &'a str {
        self.config
            .topic
            .as_deref()
            .unwrap_or_else(|| event.source.as_str())
    }

    fn publish_url(&self, topic: &str) -> String {
        format!(
            "{}/v1/projects/{}/topics/{}:publish",
            self.config.base_url.trim_end_matches('/'),
            self.config.project,
            topic
        )
    }

    fn build_request(event: &ForwardedEvent) -> Result<PublishRequest, PublishError> {
        let mut attributes = BTreeMap::new();
        attributes.insert("source", event.source.as_str().to_string());
        attributes.insert("headers", event.headers_json()?);
        attributes.insert("received_at", event.received_at.to_rfc3339());

        Ok(PublishRequest {
            messages: vec![PubSubMessage {
                data: STANDARD.encode(&event.body),
                attributes,
            }],
        })
    }
}

#[async_trait]
impl EventPublisher for PubSubEventPublisher {
    #[instrument(skip_all, fields(source = %event.source, topic = self.topic_for(event)))]
    async fn publish(&self, event: &ForwardedEvent) -> Result<MessageId, PublishError> {
        let body = Self::build_request(event)?;
        let url = self.publish_url(self.topic_for(event));

        let mut request = self.http_client.post(url).json(&body);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PublishError::Timeout {
                    timeout_seconds: self.config.request_timeout.as_secs(),
                }
            } else {
                PublishError::Unavailable {
                    message: format!("HTTP request failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            let message = format!("status {}: {}", status, text);
            warn!(status = %status, "Publish failed");
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                PublishError::Unavailable { message }
            } else {
                PublishError::Rejected { message }
            });
        }

        let parsed = response
            .json::<PublishResponse>()
            .await
            .map_err(|e| PublishError::Unavailable {
                message: format!("Failed to parse publish response: {}", e),
            })?;

        let id = parsed
            .message_ids
            .into_iter()
            .next()
            .map(MessageId::new)
            .ok_or_else(|| PublishError::Unavailable {
                message: "publish response contained no message id".to_string(),
            })?;

        info!(message_id = %id, "Published event");
        Ok(id)
    }
}

#[cfg(test)]
#[path = "pubsub_publisher_tests.rs"]
mod tests;
