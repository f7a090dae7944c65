//! Provider identification from request headers.
//!
//! Header sets from different providers can overlap, so [`identify`] applies
//! its rules in a fixed order and the first match wins.

use super::WebhookHeaders;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Closed set of webhook providers the gateway accepts events from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Github,
    Gitlab,
    Jira,
    Tekton,
    CircleCi,
    PagerDuty,
}

impl EventSource {
    /// Every known provider, in identification order of their rules.
    pub const ALL: [EventSource; 6] = [
        EventSource::Gitlab,
        EventSource::Tekton,
        EventSource::Github,
        EventSource::Jira,
        EventSource::CircleCi,
        EventSource::PagerDuty,
    ];

    /// Provider name as used on the wire and in metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Github => "github",
            EventSource::Gitlab => "gitlab",
            EventSource::Jira => "jira",
            EventSource::Tekton => "tekton",
            EventSource::CircleCi => "circleci",
            EventSource::PagerDuty => "pagerduty",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = crate::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventSource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| crate::ParseError::InvalidFormat {
                expected: "one of github, gitlab, jira, tekton, circleci, pagerduty".to_string(),
                actual: s.to_string(),
            })
    }
}

/// Result of provider identification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceIdentity {
    Known(EventSource),

    /// No rule matched. Carries the raw `User-Agent` for diagnostics.
    Unknown { user_agent: Option<String> },
}

impl SourceIdentity {
    /// Get the provider if identification succeeded
    pub fn source(&self) -> Option<EventSource> {
        match self {
            SourceIdentity::Known(source) => Some(*source),
            SourceIdentity::Unknown { .. } => None,
        }
    }
}

const GITLAB_EVENT_HEADER: &str = "X-Gitlab-Event";
const CLOUD_EVENT_TYPE_HEADER: &str = "Ce-Type";
const CIRCLECI_EVENT_HEADER: &str = "Circleci-Event-Type";
const PAGERDUTY_SIGNATURE_HEADER: &str = "X-Pagerduty-Signature";
const USER_AGENT_HEADER: &str = "User-Agent";

const TEKTON_MARKER: &str = "tekton";
const GITHUB_AGENT_MARKER: &str = "GitHub-Hookshot";
const JIRA_AGENT_MARKER: &str = "Atlassian Webhook HTTP Client";

/// Identify the provider that sent a request.
///
/// Total and deterministic: depends only on the headers. Header names are
/// matched case-insensitively, marker substrings in values are not.
///
/// # Examples
///
/// ```rust
/// use event_gate_core::{identify, EventSource, SourceIdentity, WebhookHeaders};
///
/// let headers: WebhookHeaders = [("User-Agent", "GitHub-Hookshot/abc123")].into_iter().collect();
/// assert_eq!(identify(&headers), SourceIdentity::Known(EventSource::Github));
/// ```
pub fn identify(headers: &WebhookHeaders) -> SourceIdentity {
    let user_agent = headers.get(USER_AGENT_HEADER);
    let user_agent_contains =
        |marker: &str| user_agent.is_some_and(|agent| agent.contains(marker));

    let source = if headers.contains(GITLAB_EVENT_HEADER) {
        Some(EventSource::Gitlab)
    } else if headers
        .get(CLOUD_EVENT_TYPE_HEADER)
        .is_some_and(|value| value.contains(TEKTON_MARKER))
    {
        Some(EventSource::Tekton)
    } else if user_agent_contains(GITHUB_AGENT_MARKER) {
        Some(EventSource::Github)
    } else if user_agent_contains(JIRA_AGENT_MARKER) {
        Some(EventSource::Jira)
    } else if headers.contains(CIRCLECI_EVENT_HEADER) {
        Some(EventSource::CircleCi)
    } else if headers.contains(PAGERDUTY_SIGNATURE_HEADER) {
        Some(EventSource::PagerDuty)
    } else {
        None
    };

    match source {
        Some(source) => SourceIdentity::Known(source),
        None => SourceIdentity::Unknown {
            user_agent: user_agent.map(str::to_string),
        },
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
