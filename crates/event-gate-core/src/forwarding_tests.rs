//! Tests for the forwarding model.

use super::*;
use crate::webhook::WebhookHeaders;

fn gitlab_request(team: Option<&str>) -> IncomingWebhook {
    let headers: WebhookHeaders = [
        ("host", "localhost"),
        ("x-gitlab-event", "Push Hook"),
        ("X-GITLAB-TOKEN", "foo"),
    ]
    .into_iter()
    .collect();
    IncomingWebhook::new(headers, Bytes::from_static(b"{\"object_kind\":\"push\"}"))
        .with_team(team.map(str::to_string))
}

#[test]
fn test_train_case() {
    assert_eq!(train_case("x-gitlab-token"), "X-Gitlab-Token");
    assert_eq!(train_case("USER-AGENT"), "User-Agent");
    assert_eq!(train_case("tekton-secret"), "Tekton-Secret");
    assert_eq!(train_case("ce-type"), "Ce-Type");
    assert_eq!(train_case("host"), "Host");
    assert_eq!(train_case("a--b"), "A--B");
}

#[test]
fn test_forwarded_event_keeps_body_and_headers() {
    let request = gitlab_request(None);
    let event = ForwardedEvent::from_verified(&request, EventSource::Gitlab);

    assert_eq!(event.source, EventSource::Gitlab);
    assert_eq!(event.body, request.body);
    assert_eq!(event.received_at, request.received_at);
    assert_eq!(
        event.headers,
        vec![
            ("Host".to_string(), "localhost".to_string()),
            ("X-Gitlab-Event".to_string(), "Push Hook".to_string()),
            ("X-Gitlab-Token".to_string(), "foo".to_string()),
            ("X-Team".to_string(), "default".to_string()),
        ]
    );
}

#[test]
fn test_team_is_appended() {
    let event = ForwardedEvent::from_verified(&gitlab_request(Some("team1")), EventSource::Gitlab);
    assert_eq!(event.team, "team1");
    assert_eq!(event.header("x-team"), Some("team1"));
}

#[test]
fn test_client_team_header_is_replaced() {
    let mut request = gitlab_request(None);
    request.headers.insert("x-team", "spoofed");

    let event = ForwardedEvent::from_verified(&request, EventSource::Gitlab);

    let teams: Vec<&str> = event
        .headers
        .iter()
        .filter(|(n, _)| n == "X-Team")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(teams, vec!["default"]);
}

#[test]
fn test_headers_json() {
    let event = ForwardedEvent::from_verified(&gitlab_request(Some("team1")), EventSource::Gitlab);
    let json: serde_json::Value = serde_json::from_str(&event.headers_json().unwrap()).unwrap();

    assert_eq!(json["X-Gitlab-Event"], "Push Hook");
    assert_eq!(json["X-Team"], "team1");
}

#[test]
fn test_publish_error_transience() {
    assert!(PublishError::Unavailable { message: "down".to_string() }.is_transient());
    assert!(PublishError::Timeout { timeout_seconds: 3 }.is_transient());
    assert!(!PublishError::Rejected { message: "too big".to_string() }.is_transient());
    assert!(!PublishError::Serialization { message: "bad".to_string() }.is_transient());
}

#[test]
fn test_message_id_display() {
    let id = MessageId::new("1234567890");
    assert_eq!(id.to_string(), "1234567890");
    assert_eq!(id.as_str(), "1234567890");
}
