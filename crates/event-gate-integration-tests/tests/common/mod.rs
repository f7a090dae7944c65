//! Common test utilities for event-gate-api integration tests
//!
//! The test application resolves secrets from memory:
//! - `event-handler` = `foo` (no team)
//! - `event-handler-team1` = `foo-team1`
//!
//! Verified events land in an [`InMemoryEventPublisher`] the test can inspect.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use event_gate_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use event_gate_core::{
    InMemoryEventPublisher, InMemoryKeyVaultProvider, SecretName, SecretResolver,
    SecretResolverConfig, SecretValue, VerificationDispatcher,
};
use hmac::{Hmac, Mac};
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;

pub const DEFAULT_SECRET: &str = "foo";
pub const TEAM1_SECRET: &str = "foo-team1";

pub const GITHUB_USER_AGENT: &str = "GitHub-Hookshot/abc123";
pub const JIRA_USER_AGENT: &str = "Atlassian Webhook HTTP Client";

/// Router plus handles on its collaborators
pub struct TestApp {
    pub router: Router,
    pub publisher: InMemoryEventPublisher,
    pub secrets: InMemoryKeyVaultProvider,
    pub metrics: Arc<ServiceMetrics>,
}

impl TestApp {
    pub fn new() -> Self {
        let secrets = InMemoryKeyVaultProvider::with_secrets(HashMap::from([
            secret("event-handler", DEFAULT_SECRET),
            secret("event-handler-team1", TEAM1_SECRET),
        ]));
        let publisher = InMemoryEventPublisher::new();
        let metrics = ServiceMetrics::new().unwrap();

        let resolver = SecretResolver::new(
            SecretResolverConfig::new("test-project"),
            Arc::new(secrets.clone()),
        );
        let state = AppState::new(
            ServiceConfig::default(),
            VerificationDispatcher::new(resolver),
            Arc::new(publisher.clone()),
            metrics.clone(),
        );

        Self {
            router: create_router(state),
            publisher,
            secrets,
            metrics,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn secret(name: &str, value: &str) -> (SecretName, SecretValue) {
    (
        SecretName::new(name).unwrap(),
        SecretValue::from_string(value.to_string()),
    )
}

/// `POST` to `uri` with the given headers and body
pub fn post(uri: &str, headers: &[(&str, &str)], body: &'static str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn github_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<sha1::Sha1>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn circleci_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("v1={}", hex::encode(mac.finalize().into_bytes()))
}

pub async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}
