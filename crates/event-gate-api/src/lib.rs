//! # Event-Gate HTTP Service
//!
//! HTTP surface of the Event-Gate webhook gateway.
//!
//! This service provides:
//! - `POST /`: webhook intake. Verified requests are forwarded to the queue
//!   and answered with `204 No Content`; everything else gets an empty
//!   `403 Forbidden`.
//! - `GET /health`: liveness
//! - `GET /metrics`: Prometheus metrics

pub mod config;
pub mod errors;
pub mod metrics;

pub use config::{LoggingConfig, QueueConfig, SecretsConfig, ServerConfig, ServiceConfig};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::ServiceMetrics;

use axum::{
    extract::{DefaultBodyLimit, RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use event_gate_core::{
    EventPublisher, ForwardedEvent, IncomingWebhook, SecretResolver, Timestamp,
    VerificationDispatcher, VerificationError, WebhookHeaders,
};
use serde::Serialize;
use std::{
    future::{Future, IntoFuture},
    sync::Arc,
    time::{Duration, Instant},
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Decides whether a webhook is authentic
    pub dispatcher: Arc<VerificationDispatcher>,

    /// Receives verified events
    pub publisher: Arc<dyn EventPublisher>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        dispatcher: VerificationDispatcher,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            publisher,
            metrics,
        }
    }

    /// Build the state, including the secret store and queue clients, from
    /// configuration
    ///
    /// # Errors
    /// Returns `ServiceError::Configuration` if the configuration is invalid
    /// or a client cannot be created.
    pub fn from_config(config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;

        let provider = config.secrets.build_provider()?;
        let resolver = SecretResolver::new(config.secrets.resolver_config(), provider);
        let dispatcher = VerificationDispatcher::new(resolver)
            .with_secret_timeout(config.server.secret_timeout());
        let publisher = config.queue.build_publisher()?;

        let metrics = ServiceMetrics::new().map_err(|e| ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })?;

        Ok(Self::new(config, dispatcher, publisher, metrics))
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_body_size;
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    Router::new()
        .route("/", post(handle_webhook).fallback(handle_other_method))
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(DefaultBodyLimit::max(max_body_size))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
pub async fn start_server(config: ServiceConfig) -> Result<(), ServiceError> {
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let address = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    serve_until_shutdown(listener, app, shutdown_signal(), shutdown_timeout).await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Serve until `signal` completes, then give in-flight requests at most
/// `shutdown_timeout` to finish before returning.
async fn serve_until_shutdown(
    listener: tokio::net::TcpListener,
    app: Router,
    signal: impl Future<Output = ()> + Send + 'static,
    shutdown_timeout: Duration,
) -> Result<(), ServiceError> {
    let (signalled_tx, mut signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        Ok(()) = &mut signalled_rx => {
            info!(
                timeout_seconds = shutdown_timeout.as_secs_f64(),
                "Draining in-flight requests"
            );
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        timeout_seconds = shutdown_timeout.as_secs_f64(),
                        "Graceful shutdown timed out; abandoning in-flight requests"
                    );
                    Ok(())
                }
            }
        }
    };

    result.map_err(|e| ServiceError::ServerFailed {
        message: e.to_string(),
    })
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle an inbound webhook
///
/// 1. Verify the request. Any failure is an empty `403`.
/// 2. Forward the verified event once. A queue failure is a `503`.
/// 3. Answer `204 No Content`.
#[instrument(skip_all, fields(body_len = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    let started = Instant::now();
    let result = process_webhook(&state, query.as_deref(), &headers, body).await;
    state
        .metrics
        .webhook_duration_seconds
        .observe(started.elapsed().as_secs_f64());
    result
}

async fn process_webhook(
    state: &AppState,
    query: Option<&str>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    let (team, token) = parse_query(query);
    let request = IncomingWebhook::new(to_webhook_headers(headers), body)
        .with_team(team)
        .with_token(token);

    let verdict = state.dispatcher.dispatch(&request).await;

    let source_label = verdict.source().map_or("unknown", |s| s.as_str());
    state
        .metrics
        .webhook_requests_total
        .with_label_values(&[source_label])
        .inc();

    let source = match verdict.source() {
        Some(source) if verdict.accepted => source,
        _ => {
            state
                .metrics
                .webhook_rejections_total
                .with_label_values(&[verdict.reason_kind()])
                .inc();
            let error = verdict
                .error
                .unwrap_or(VerificationError::UnknownSource { user_agent: None });
            return Err(WebhookHandlerError::Forbidden(error));
        }
    };

    let event = ForwardedEvent::from_verified(&request, source);
    match state.publisher.publish(&event).await {
        Ok(message_id) => {
            state
                .metrics
                .webhook_forwarded_total
                .with_label_values(&[source.as_str()])
                .inc();
            info!(
                provider = %source,
                team = %event.team,
                message_id = %message_id,
                "Forwarded verified webhook"
            );
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            state
                .metrics
                .webhook_forward_failures_total
                .with_label_values(&[source.as_str()])
                .inc();
            Err(WebhookHandlerError::ForwardingFailed(e))
        }
    }
}

/// Every method except `POST` on the webhook endpoint is forbidden
async fn handle_other_method(method: Method) -> WebhookHandlerError {
    WebhookHandlerError::MethodNotAllowed {
        method: method.to_string(),
    }
}

/// Read the first `team` and `token` query parameters
fn parse_query(query: Option<&str>) -> (Option<String>, Option<String>) {
    let mut team = None;
    let mut token = None;

    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "team" if team.is_none() => team = Some(value.into_owned()),
                "token" if token.is_none() => token = Some(value.into_owned()),
                _ => {}
            }
        }
    }

    (team, token)
}

/// Copy request headers in received order. Non-UTF-8 values are converted lossily.
fn to_webhook_headers(headers: &HeaderMap) -> WebhookHeaders {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

// ============================================================================
// Health and Metrics Handlers
// ============================================================================

/// Basic health check endpoint
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Timestamp::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to render metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Response Types
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub version: String,
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
