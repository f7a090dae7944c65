//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use event_gate_core::{PublishError, VerificationError};
use tracing::{error, warn};

/// Webhook handler errors with HTTP status code mapping
///
/// - `403 Forbidden`: the request failed verification. The body is empty
///   and identical for every cause so callers learn nothing about why.
/// - `503 Service Unavailable`: the request was verified but could not be
///   forwarded. Never reported as an authentication failure.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    #[error("Forbidden: {0}")]
    Forbidden(#[from] VerificationError),

    /// Any method other than `POST` on the webhook endpoint
    #[error("Method not allowed: {method}")]
    MethodNotAllowed { method: String },

    #[error("Forwarding failed: {0}")]
    ForwardingFailed(#[from] PublishError),
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        match self {
            Self::Forbidden(ref e) => {
                warn!(kind = e.kind(), "Responding 403 to rejected webhook");
                StatusCode::FORBIDDEN.into_response()
            }
            Self::MethodNotAllowed { ref method } => {
                warn!(method = %method, "Responding 403 to non-POST webhook request");
                StatusCode::FORBIDDEN.into_response()
            }
            Self::ForwardingFailed(ref e) => {
                error!(
                    error = %e,
                    transient = e.is_transient(),
                    "Failed to forward verified webhook"
                );
                let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
                if e.is_transient() {
                    if let Ok(header_value) = "30".parse() {
                        response.headers_mut().insert("Retry-After", header_value);
                    }
                }
                response
            }
        }
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}
