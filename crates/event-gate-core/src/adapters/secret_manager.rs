//! # Secret Manager Implementation
//!
//! REST client for a Google Secret Manager compatible API.
//!
//! Always requests the `latest` version of a secret:
//!
//! ```text
//! GET {base_url}/v1/projects/{project}/secrets/{name}/versions/latest:access
//! ```
//!
//! The response carries the secret bytes base64 encoded in
//! `payload.data`.

use crate::key_vault::{KeyVaultError, KeyVaultProvider, SecretName, SecretValue};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Default API endpoint
pub const DEFAULT_SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

/// Connection settings for [`SecretManagerKeyVaultProvider`]
#[derive(Clone)]
pub struct SecretManagerConfig {
    pub project: String,
    pub base_url: String,

    /// Bearer token sent with every request, if any
    pub access_token: Option<String>,

    pub request_timeout: Duration,
}

impl SecretManagerConfig {
    /// Create a configuration for the default endpoint
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            base_url: DEFAULT_SECRET_MANAGER_URL.to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(10),
        }
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

impl std::fmt::Debug for SecretManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManagerConfig")
            .field("project", &self.project)
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Deserialize)]
struct SecretPayload {
    data: String,
}

/// Secret store backed by the Secret Manager REST API
#[derive(Debug, Clone)]
pub struct SecretManagerKeyVaultProvider {
    config: SecretManagerConfig,
    http_client: reqwest::Client,
}

impl SecretManagerKeyVaultProvider {
    /// Create a new provider
    ///
    /// # Errors
    /// Returns `KeyVaultError::Configuration` if the project is empty, the
    /// base URL is invalid or the HTTP client cannot be created.
    pub fn new(config: SecretManagerConfig) -> Result<Self, KeyVaultError> {
        if config.project.trim().is_empty() {
            return Err(KeyVaultError::Configuration {
                message: "project is required".to_string(),
            });
        }

        Url::parse(&config.base_url).map_err(|e| KeyVaultError::Configuration {
            message: format!("invalid base_url '{}': {}", config.base_url, e),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| KeyVaultError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn secret_url(&self, name: &SecretName) -> String {
        format!(
            "{}/v1/projects/{}/secrets/{}/versions/latest:access",
            self.config.base_url.trim_end_matches('/'),
            self.config.project,
            name
        )
    }

    fn map_status(&self, name: &SecretName, status: StatusCode, body: String) -> KeyVaultError {
        match status {
            StatusCode::NOT_FOUND => KeyVaultError::SecretNotFound { name: name.clone() },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => KeyVaultError::AccessDenied {
                name: name.clone(),
                reason: format!("status {}", status),
            },
            StatusCode::TOO_MANY_REQUESTS => KeyVaultError::RateLimitExceeded {
                retry_after_seconds: 60,
            },
            s if s.is_server_error() => KeyVaultError::ServiceUnavailable {
                message: format!("status {}: {}", s, body),
            },
            s => KeyVaultError::Internal {
                message: format!("unexpected status {}: {}", s, body),
            },
        }
    }
}

#[async_trait]
impl KeyVaultProvider for SecretManagerKeyVaultProvider {
    #[instrument(skip(self), fields(project = %self.config.project))]
    async fn get_secret(&self, name: &SecretName) -> Result<SecretValue, KeyVaultError> {
        let mut request = self.http_client.get(self.secret_url(name));
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                KeyVaultError::timeout(self.config.request_timeout)
            } else {
                KeyVaultError::ServiceUnavailable {
                    message: format!("HTTP request failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            let error = self.map_status(name, status, body);
            warn!(secret_name = %name, status = %status, error = %error, "Secret access failed");
            return Err(error);
        }

        let parsed = response
            .json::<AccessSecretVersionResponse>()
            .await
            .map_err(|e| KeyVaultError::Internal {
                message: format!("Failed to parse secret response: {}", e),
            })?;

        let bytes = STANDARD
            .decode(parsed.payload.data.as_bytes())
            .map_err(|e| KeyVaultError::Internal {
                message: format!("Secret payload is not valid base64: {}", e),
            })?;

        debug!(secret_name = %name, secret_len = bytes.len(), "Fetched latest secret version");
        Ok(SecretValue::from_bytes(bytes))
    }
}

#[cfg(test)]
#[path = "secret_manager_tests.rs"]
mod tests;
