//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use event_gate_core::{
    adapters::{
        pubsub_publisher::DEFAULT_PUBSUB_URL, secret_manager::DEFAULT_SECRET_MANAGER_URL,
    },
    secret_resolver::DEFAULT_BASE_SECRET_NAME,
    EventPublisher, InMemoryEventPublisher, InMemoryKeyVaultProvider, KeyVaultProvider,
    PubSubConfig, PubSubEventPublisher, SecretManagerConfig, SecretManagerKeyVaultProvider,
    SecretName, SecretResolverConfig, SecretValue,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::warn;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Where webhook secrets come from
    pub secrets: SecretsConfig,

    /// Where verified events go
    pub queue: QueueConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` or `ConfigError::Missing` for the first
    /// problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.secrets.validate()?;
        self.queue.validate()?;

        // A slow secret lookup must reject and a slow publish must answer 503
        // before the request timeout cuts the connection.
        let budget = self.server.secret_timeout_seconds + self.queue.publish_timeout_seconds();
        if budget >= self.server.timeout_seconds {
            return Err(ConfigError::Invalid {
                message: format!(
                    "server.secret_timeout_seconds plus the queue request timeout ({}s) \
                     must be less than server.timeout_seconds ({}s)",
                    budget, self.server.timeout_seconds
                ),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,

    /// Upper bound on one secret lookup, in seconds
    pub secret_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_seconds: 30,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
            secret_timeout_seconds: 10,
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }
        if self.timeout_seconds == 0 || self.secret_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server timeouts must be greater than zero".to_string(),
            });
        }
        if self.secret_timeout_seconds >= self.timeout_seconds {
            return Err(ConfigError::Invalid {
                message: "server.secret_timeout_seconds must be less than server.timeout_seconds"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Secret lookup timeout as a `Duration`
    pub fn secret_timeout(&self) -> Duration {
        Duration::from_secs(self.secret_timeout_seconds)
    }
}

fn default_base_secret_name() -> String {
    DEFAULT_BASE_SECRET_NAME.to_string()
}

fn default_secret_manager_url() -> String {
    DEFAULT_SECRET_MANAGER_URL.to_string()
}

fn default_pubsub_url() -> String {
    DEFAULT_PUBSUB_URL.to_string()
}

fn default_request_timeout_seconds() -> u64 {
    10
}

/// Source of webhook secrets
///
/// Use [`SecretsConfig::SecretManager`] in production.
/// [`SecretsConfig::Literal`] is for development and testing only; a startup
/// `WARN` is emitted when it is active.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SecretsConfig {
    /// Secrets read from a Secret Manager compatible REST API.
    SecretManager {
        project: String,

        #[serde(default = "default_secret_manager_url")]
        base_url: String,

        #[serde(default = "default_base_secret_name")]
        base_secret_name: String,

        #[serde(default)]
        access_token: Option<String>,

        #[serde(default = "default_request_timeout_seconds")]
        request_timeout_seconds: u64,
    },

    /// Secrets embedded in the configuration, keyed by full secret name.
    Literal {
        #[serde(default)]
        project: String,

        #[serde(default = "default_base_secret_name")]
        base_secret_name: String,

        secrets: HashMap<String, String>,
    },
}

impl Default for SecretsConfig {
    fn default() -> Self {
        SecretsConfig::SecretManager {
            project: String::new(),
            base_url: default_secret_manager_url(),
            base_secret_name: default_base_secret_name(),
            access_token: None,
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SecretManager {
                project,
                base_url,
                base_secret_name,
                access_token,
                request_timeout_seconds,
            } => f
                .debug_struct("SecretsConfig::SecretManager")
                .field("project", project)
                .field("base_url", base_url)
                .field("base_secret_name", base_secret_name)
                .field("access_token", &access_token.as_ref().map(|_| "<REDACTED>"))
                .field("request_timeout_seconds", request_timeout_seconds)
                .finish(),
            Self::Literal {
                project,
                base_secret_name,
                secrets,
            } => f
                .debug_struct("SecretsConfig::Literal")
                .field("project", project)
                .field("base_secret_name", base_secret_name)
                .field("secrets", &secrets.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl SecretsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let base_secret_name = match self {
            Self::SecretManager {
                project,
                base_secret_name,
                request_timeout_seconds,
                ..
            } => {
                if project.trim().is_empty() {
                    return Err(ConfigError::Missing {
                        key: "secrets.project".to_string(),
                    });
                }
                if *request_timeout_seconds == 0 {
                    return Err(ConfigError::Invalid {
                        message: "secrets.request_timeout_seconds must be greater than zero"
                            .to_string(),
                    });
                }
                base_secret_name
            }
            Self::Literal {
                base_secret_name,
                secrets,
                ..
            } => {
                for name in secrets.keys() {
                    SecretName::new(name.as_str()).map_err(|e| ConfigError::Invalid {
                        message: format!("secrets.secrets: {}", e),
                    })?;
                }
                base_secret_name
            }
        };

        SecretName::new(base_secret_name.as_str()).map_err(|e| ConfigError::Invalid {
            message: format!("secrets.base_secret_name: {}", e),
        })?;
        Ok(())
    }

    /// Settings for the secret resolver
    pub fn resolver_config(&self) -> SecretResolverConfig {
        match self {
            Self::SecretManager {
                project,
                base_secret_name,
                ..
            }
            | Self::Literal {
                project,
                base_secret_name,
                ..
            } => SecretResolverConfig::new(project.clone())
                .with_base_secret_name(base_secret_name.clone()),
        }
    }

    /// Build the configured secret store
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the store cannot be created.
    pub fn build_provider(&self) -> Result<Arc<dyn KeyVaultProvider>, ConfigError> {
        match self {
            Self::SecretManager {
                project,
                base_url,
                access_token,
                request_timeout_seconds,
                ..
            } => {
                let config = SecretManagerConfig::new(project.clone())
                    .with_base_url(base_url.clone())
                    .with_access_token(access_token.clone())
                    .with_request_timeout(Duration::from_secs(*request_timeout_seconds));
                let provider =
                    SecretManagerKeyVaultProvider::new(config).map_err(|e| ConfigError::Invalid {
                        message: format!("secret manager: {}", e),
                    })?;
                Ok(Arc::new(provider))
            }
            Self::Literal { secrets, .. } => {
                warn!(
                    secret_count = secrets.len(),
                    "Using literal webhook secrets from configuration. Do not use in production."
                );
                let provider = InMemoryKeyVaultProvider::new();
                for (name, value) in secrets {
                    let name = SecretName::new(name.as_str()).map_err(|e| ConfigError::Invalid {
                        message: format!("secrets.secrets: {}", e),
                    })?;
                    provider
                        .add_secret(name, SecretValue::from_string(value.clone()))
                        .map_err(|e| ConfigError::Invalid {
                            message: e.to_string(),
                        })?;
                }
                Ok(Arc::new(provider))
            }
        }
    }
}

/// Destination of verified events
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum QueueConfig {
    /// Pub/Sub compatible REST API. Without a `topic`, each provider
    /// publishes to a topic of its own name.
    PubSub {
        project: String,

        #[serde(default)]
        topic: Option<String>,

        #[serde(default = "default_pubsub_url")]
        base_url: String,

        #[serde(default)]
        access_token: Option<String>,

        #[serde(default = "default_request_timeout_seconds")]
        request_timeout_seconds: u64,
    },

    /// Events kept in process memory. Development and testing only.
    InMemory,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig::PubSub {
            project: String::new(),
            topic: None,
            base_url: default_pubsub_url(),
            access_token: None,
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl std::fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PubSub {
                project,
                topic,
                base_url,
                access_token,
                request_timeout_seconds,
            } => f
                .debug_struct("QueueConfig::PubSub")
                .field("project", project)
                .field("topic", topic)
                .field("base_url", base_url)
                .field("access_token", &access_token.as_ref().map(|_| "<REDACTED>"))
                .field("request_timeout_seconds", request_timeout_seconds)
                .finish(),
            Self::InMemory => f.write_str("QueueConfig::InMemory"),
        }
    }
}

impl QueueConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Self::PubSub {
            project,
            topic,
            request_timeout_seconds,
            ..
        } = self
        {
            if project.trim().is_empty() {
                return Err(ConfigError::Missing {
                    key: "queue.project".to_string(),
                });
            }
            if topic.as_deref().is_some_and(|t| t.trim().is_empty()) {
                return Err(ConfigError::Invalid {
                    message: "queue.topic must not be empty when set".to_string(),
                });
            }
            if *request_timeout_seconds == 0 {
                return Err(ConfigError::Invalid {
                    message: "queue.request_timeout_seconds must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Upper bound of one publish attempt in seconds, zero for the in-memory queue
    pub fn publish_timeout_seconds(&self) -> u64 {
        match self {
            Self::PubSub {
                request_timeout_seconds,
                ..
            } => *request_timeout_seconds,
            Self::InMemory => 0,
        }
    }

    /// Build the configured publisher
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the publisher cannot be created.
    pub fn build_publisher(&self) -> Result<Arc<dyn EventPublisher>, ConfigError> {
        match self {
            Self::PubSub {
                project,
                topic,
                base_url,
                access_token,
                request_timeout_seconds,
            } => {
                let config = PubSubConfig::new(project.clone())
                    .with_topic(topic.clone())
                    .with_base_url(base_url.clone())
                    .with_access_token(access_token.clone())
                    .with_request_timeout(Duration::from_secs(*request_timeout_seconds));
                let publisher =
                    PubSubEventPublisher::new(config).map_err(|e| ConfigError::Invalid {
                        message: format!("pub/sub: {}", e),
                    })?;
                Ok(Arc::new(publisher))
            }
            Self::InMemory => {
                warn!("Using in-memory event queue; verified events are not delivered anywhere");
                Ok(Arc::new(InMemoryEventPublisher::new()))
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level, used when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
