//! Tests for the provider contract table.

use super::*;
use crate::webhook::WebhookHeaders;
use bytes::Bytes;

#[test]
fn test_every_source_has_its_own_contract() {
    for source in EventSource::ALL {
        assert_eq!(source.contract().source, source);
    }
    assert_eq!(EventSourceContract::all().len(), EventSource::ALL.len());
}

#[test]
fn test_contract_table_entries() {
    let expected = [
        (
            EventSource::Github,
            CredentialLocation::Header("X-Hub-Signature"),
            VerificationStrategy::HmacSha1Prefixed,
        ),
        (
            EventSource::Gitlab,
            CredentialLocation::Header("X-Gitlab-Token"),
            VerificationStrategy::SharedToken,
        ),
        (
            EventSource::Jira,
            CredentialLocation::QueryParameter("token"),
            VerificationStrategy::SharedToken,
        ),
        (
            EventSource::Tekton,
            CredentialLocation::Header("tekton-secret"),
            VerificationStrategy::SharedToken,
        ),
        (
            EventSource::CircleCi,
            CredentialLocation::Header("Circleci-Signature"),
            VerificationStrategy::HmacSha256Prefixed,
        ),
        (
            EventSource::PagerDuty,
            CredentialLocation::Header("X-Pagerduty-Signature"),
            VerificationStrategy::SignatureList,
        ),
    ];

    for (source, credential, strategy) in expected {
        let contract = source.contract();
        assert_eq!(contract.credential, credential, "{source}");
        assert_eq!(contract.strategy, strategy, "{source}");
    }
}

#[test]
fn test_header_credential_is_read_case_insensitively() {
    let headers: WebhookHeaders = [("x-gitlab-token", "foo")].into_iter().collect();
    let request = IncomingWebhook::new(headers, Bytes::new());

    assert_eq!(EventSource::Gitlab.contract().extract_credential(&request), Some("foo"));
    assert_eq!(EventSource::Github.contract().extract_credential(&request), None);
}

#[test]
fn test_jira_credential_comes_from_query_token() {
    let headers: WebhookHeaders = [("X-Gitlab-Token", "from-header")].into_iter().collect();
    let request = IncomingWebhook::new(headers, Bytes::new()).with_token(Some("foo".to_string()));

    assert_eq!(EventSource::Jira.contract().extract_credential(&request), Some("foo"));
}

#[test]
fn test_missing_query_token_is_absent() {
    let request = IncomingWebhook::new(WebhookHeaders::new(), Bytes::new());
    assert_eq!(EventSource::Jira.contract().extract_credential(&request), None);
}

#[test]
fn test_mismatch_is_attributed_to_provider() {
    let secret = SecretValue::from_string("foo".to_string());
    let err = EventSource::Tekton
        .contract()
        .verify("bar", &secret, b"")
        .unwrap_err();

    let VerificationError::VerificationMismatch { provider } = &err else {
        panic!("expected a mismatch, got {err:?}");
    };
    assert_eq!(provider, "tekton");
}

#[test]
fn test_non_mismatch_errors_pass_through() {
    let secret = SecretValue::from_string("foo".to_string());
    let err = EventSource::PagerDuty
        .contract()
        .verify(",", &secret, b"")
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_credential");
}
