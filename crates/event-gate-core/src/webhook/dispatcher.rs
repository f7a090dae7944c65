//! # Verification Dispatcher
//!
//! Turns one [`IncomingWebhook`] into one [`VerificationVerdict`].
//!
//! The dispatcher fails closed: every error on the way, from an
//! unrecognised sender to a secret store timeout, ends in a rejected
//! verdict. Nothing is raised past [`VerificationDispatcher::dispatch`].
//!
//! ## Order of checks
//!
//! 1. Identify the provider. Unknown senders are rejected before any secret
//!    lookup so the response does not reveal which secrets exist.
//! 2. Read the credential named by the provider's contract. An absent or
//!    empty credential is rejected before any secret lookup.
//! 3. Validate the team parameter.
//! 4. Resolve the team's secret under a timeout.
//! 5. Run the provider's strategy over the raw body.

use super::{
    source::{identify, EventSource, SourceIdentity},
    IncomingWebhook, VerificationError,
};
use crate::{secret_resolver::SecretResolver, TeamId};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default upper bound on a single secret lookup.
pub const DEFAULT_SECRET_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept/reject decision for one request
#[derive(Debug, Clone)]
pub struct VerificationVerdict {
    pub accepted: bool,

    /// Provider name, or the raw user agent (possibly empty) for unknown senders
    pub provider_name: String,

    /// `"ok"` when accepted, otherwise the error message
    pub reason: String,

    /// Diagnostic detail of a rejection
    pub error: Option<VerificationError>,

    /// Validated team, if the request named one
    pub team: Option<TeamId>,

    source: Option<EventSource>,
}

impl VerificationVerdict {
    /// Build an accepting verdict
    pub fn accepted(source: EventSource) -> Self {
        Self {
            accepted: true,
            provider_name: source.as_str().to_string(),
            reason: "ok".to_string(),
            error: None,
            team: None,
            source: Some(source),
        }
    }

    /// Build a rejecting verdict
    pub fn rejected(provider_name: impl Into<String>, error: VerificationError) -> Self {
        Self {
            accepted: false,
            provider_name: provider_name.into(),
            reason: error.to_string(),
            error: Some(error),
            team: None,
            source: None,
        }
    }

    fn for_source(mut self, source: EventSource) -> Self {
        self.source = Some(source);
        self
    }

    fn with_team(mut self, team: Option<TeamId>) -> Self {
        self.team = team;
        self
    }

    /// Check whether the request was rejected because its sender is unknown
    pub fn is_unknown_source(&self) -> bool {
        matches!(self.error, Some(VerificationError::UnknownSource { .. }))
    }

    /// Identified provider, if any
    pub fn source(&self) -> Option<EventSource> {
        self.source
    }

    /// Team label for forwarding and metrics
    pub fn team_label(&self) -> &str {
        TeamId::label(self.team.as_ref())
    }

    /// Error kind for metrics, `"accepted"` when there is none
    pub fn reason_kind(&self) -> &'static str {
        self.error.as_ref().map_or("accepted", VerificationError::kind)
    }
}

/// Orchestrates identification, secret resolution and credential checks
#[derive(Debug, Clone)]
pub struct VerificationDispatcher {
    resolver: SecretResolver,
    secret_timeout: Duration,
}

impl VerificationDispatcher {
    /// Create a dispatcher with the default secret lookup timeout
    pub fn new(resolver: SecretResolver) -> Self {
        Self {
            resolver,
            secret_timeout: DEFAULT_SECRET_TIMEOUT,
        }
    }

    /// Override the secret lookup timeout
    pub fn with_secret_timeout(mut self, timeout: Duration) -> Self {
        self.secret_timeout = timeout;
        self
    }

    /// Get the secret lookup timeout
    pub fn secret_timeout(&self) -> Duration {
        self.secret_timeout
    }

    /// Decide whether a request is authentic.
    ///
    /// Infallible by construction; failures are reported through the verdict.
    #[instrument(skip_all, fields(body_len = request.body.len()))]
    pub async fn dispatch(&self, request: &IncomingWebhook) -> VerificationVerdict {
        let verdict = match identify(&request.headers) {
            SourceIdentity::Unknown { user_agent } => VerificationVerdict::rejected(
                user_agent.clone().unwrap_or_default(),
                VerificationError::UnknownSource { user_agent },
            ),
            SourceIdentity::Known(source) => self.verify_known(source, request).await,
        };

        if verdict.accepted {
            info!(
                provider = %verdict.provider_name,
                team = verdict.team_label(),
                "Webhook verified"
            );
        } else {
            warn!(
                provider = %verdict.provider_name,
                kind = verdict.reason_kind(),
                reason = %verdict.reason,
                "Webhook rejected"
            );
        }

        verdict
    }

    async fn verify_known(
        &self,
        source: EventSource,
        request: &IncomingWebhook,
    ) -> VerificationVerdict {
        let reject = |error: VerificationError| {
            VerificationVerdict::rejected(source.as_str(), error).for_source(source)
        };

        let contract = source.contract();

        let credential = match contract.extract_credential(request) {
            Some(credential) if !credential.is_empty() => credential,
            Some(_) => return reject(VerificationError::malformed("credential is empty")),
            None => return reject(VerificationError::malformed("credential is missing")),
        };

        let team = match request.team.as_deref().map(TeamId::new).transpose() {
            Ok(team) => team,
            Err(e) => {
                return reject(VerificationError::InvalidTeam {
                    reason: e.to_string(),
                })
            }
        };

        let lookup = self.resolver.resolve(team.as_ref());
        let secret = match tokio::time::timeout(self.secret_timeout, lookup).await {
            Ok(Ok(secret)) => secret,
            Ok(Err(e)) => return reject(e.into()).with_team(team),
            Err(_) => {
                return reject(VerificationError::SecretUnavailable {
                    message: format!(
                        "secret lookup timed out after {} ms",
                        self.secret_timeout.as_millis()
                    ),
                })
                .with_team(team)
            }
        };

        match contract.verify(credential, &secret, &request.body) {
            Ok(()) => VerificationVerdict::accepted(source).with_team(team),
            Err(e) => reject(e).with_team(team),
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
