//! Static mapping from provider to credential location and signing scheme.

use super::{
    source::EventSource, strategy::VerificationStrategy, IncomingWebhook, VerificationError,
};
use crate::key_vault::SecretValue;

/// Where a provider places its credential on the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialLocation {
    /// Request header, matched case-insensitively
    Header(&'static str),

    /// Query string parameter. Only `token` is currently recognised.
    QueryParameter(&'static str),
}

/// How one provider proves that a payload is authentic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSourceContract {
    pub source: EventSource,
    pub credential: CredentialLocation,
    pub strategy: VerificationStrategy,
}

/// One entry per [`EventSource`]; the set is closed.
static CONTRACTS: [EventSourceContract; 6] = [
    EventSourceContract {
        source: EventSource::Github,
        credential: CredentialLocation::Header("X-Hub-Signature"),
        strategy: VerificationStrategy::HmacSha1Prefixed,
    },
    EventSourceContract {
        source: EventSource::Gitlab,
        credential: CredentialLocation::Header("X-Gitlab-Token"),
        strategy: VerificationStrategy::SharedToken,
    },
    EventSourceContract {
        source: EventSource::Jira,
        credential: CredentialLocation::QueryParameter("token"),
        strategy: VerificationStrategy::SharedToken,
    },
    EventSourceContract {
        source: EventSource::Tekton,
        credential: CredentialLocation::Header("tekton-secret"),
        strategy: VerificationStrategy::SharedToken,
    },
    EventSourceContract {
        source: EventSource::CircleCi,
        credential: CredentialLocation::Header("Circleci-Signature"),
        strategy: VerificationStrategy::HmacSha256Prefixed,
    },
    EventSourceContract {
        source: EventSource::PagerDuty,
        credential: CredentialLocation::Header("X-Pagerduty-Signature"),
        strategy: VerificationStrategy::SignatureList,
    },
];

impl EventSource {
    /// Get the verification contract for this provider
    pub fn contract(&self) -> &'static EventSourceContract {
        match self {
            EventSource::Github => &CONTRACTS[0],
            EventSource::Gitlab => &CONTRACTS[1],
            EventSource::Jira => &CONTRACTS[2],
            EventSource::Tekton => &CONTRACTS[3],
            EventSource::CircleCi => &CONTRACTS[4],
            EventSource::PagerDuty => &CONTRACTS[5],
        }
    }
}

impl EventSourceContract {
    /// All contracts in table order
    pub fn all() -> &'static [EventSourceContract] {
        &CONTRACTS
    }

    /// Read the credential from the request, if present.
    ///
    /// An empty value is returned as-is; rejecting it is the caller's job.
    pub fn extract_credential<'a>(&self, request: &'a IncomingWebhook) -> Option<&'a str> {
        match self.credential {
            CredentialLocation::Header(name) => request.headers.get(name),
            CredentialLocation::QueryParameter("token") => request.token.as_deref(),
            CredentialLocation::QueryParameter(_) => None,
        }
    }

    /// Run the provider's strategy, attributing a mismatch to the provider.
    pub fn verify(
        &self,
        credential: &str,
        secret: &SecretValue,
        body: &[u8],
    ) -> Result<(), VerificationError> {
        self.strategy
            .verify(credential, secret, body)
            .map_err(|e| match e {
                VerificationError::VerificationMismatch { .. } => {
                    VerificationError::VerificationMismatch {
                        provider: self.source.as_str().to_string(),
                    }
                }
                other => other,
            })
    }
}

#[cfg(test)]
#[path = "contract_tests.rs"]
mod tests;
