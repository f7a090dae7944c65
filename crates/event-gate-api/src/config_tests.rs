//! Tests for [`ServiceConfig`], [`SecretsConfig`] and [`QueueConfig`].

use super::*;

fn literal_secrets() -> SecretsConfig {
    SecretsConfig::Literal {
        project: "local".to_string(),
        base_secret_name: DEFAULT_BASE_SECRET_NAME.to_string(),
        secrets: HashMap::from([
            ("event-handler".to_string(), "foo".to_string()),
            ("event-handler-team1".to_string(), "foo-team1".to_string()),
        ]),
    }
}

fn dev_config() -> ServiceConfig {
    ServiceConfig {
        secrets: literal_secrets(),
        queue: QueueConfig::InMemory,
        ..ServiceConfig::default()
    }
}

mod service_config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_body_size, 10 * 1024 * 1024);
        assert_eq!(config.server.secret_timeout(), Duration::from_secs(10));
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_default_config_requires_projects() {
        let err = ServiceConfig::default().validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Missing { ref key } if key == "secrets.project"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_dev_config_is_valid() {
        assert!(dev_config().validate().is_ok());
    }

    #[test]
    fn test_zero_body_size_is_invalid() {
        let mut config = dev_config();
        config.server.max_body_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_secret_timeout_must_fit_request_timeout() {
        let mut config = dev_config();
        config.server.timeout_seconds = 5;
        config.server.secret_timeout_seconds = 6;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_secret_timeout_equal_to_request_timeout_is_invalid() {
        let mut config = dev_config();
        config.server.timeout_seconds = 1;
        config.server.secret_timeout_seconds = 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        config.server.timeout_seconds = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secret_and_publish_timeouts_must_fit_request_timeout() {
        let mut config = dev_config();
        config.queue = QueueConfig::PubSub {
            project: "fourkeys".to_string(),
            topic: None,
            base_url: default_pubsub_url(),
            access_token: None,
            request_timeout_seconds: 20,
        };
        config.server.timeout_seconds = 30;
        config.server.secret_timeout_seconds = 10;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        config.server.secret_timeout_seconds = 9;
        assert!(config.validate().is_ok());
        assert_eq!(config.queue.publish_timeout_seconds(), 20);
    }

    #[test]
    fn test_deserializes_tagged_sections() {
        let json = serde_json::json!({
            "server": { "port": 9090 },
            "secrets": { "type": "secret_manager", "project": "fourkeys" },
            "queue": { "type": "pub_sub", "project": "fourkeys" },
            "logging": { "json_format": true }
        });

        let config: ServiceConfig = serde_json::from_value(json).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.timeout_seconds, 30);
        assert!(config.logging.json_format);
        match &config.secrets {
            SecretsConfig::SecretManager {
                base_url,
                base_secret_name,
                request_timeout_seconds,
                ..
            } => {
                assert_eq!(base_url, DEFAULT_SECRET_MANAGER_URL);
                assert_eq!(base_secret_name, "event-handler");
                assert_eq!(*request_timeout_seconds, 10);
            }
            other => panic!("unexpected secrets config: {other:?}"),
        }
        assert!(matches!(config.queue, QueueConfig::PubSub { topic: None, .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserializes_in_memory_queue() {
        let json = serde_json::json!({
            "secrets": { "type": "literal", "secrets": { "event-handler": "foo" } },
            "queue": { "type": "in_memory" }
        });

        let config: ServiceConfig = serde_json::from_value(json).unwrap();
        assert!(matches!(config.queue, QueueConfig::InMemory));
        assert!(config.validate().is_ok());
    }
}

mod secrets_config_tests {
    use super::*;

    #[test]
    fn test_literal_debug_redacts_values() {
        let debug = format!("{:?}", literal_secrets());
        assert!(!debug.contains("foo-team1\""), "{debug}");
        assert!(debug.contains("event-handler-team1"));
    }

    #[test]
    fn test_secret_manager_debug_redacts_token() {
        let config = SecretsConfig::SecretManager {
            project: "fourkeys".to_string(),
            base_url: default_secret_manager_url(),
            base_secret_name: default_base_secret_name(),
            access_token: Some("ya29.secret".to_string()),
            request_timeout_seconds: 10,
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ya29.secret"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_invalid_literal_secret_name_is_rejected() {
        let config = SecretsConfig::Literal {
            project: String::new(),
            base_secret_name: default_base_secret_name(),
            secrets: HashMap::from([("bad name".to_string(), "x".to_string())]),
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_invalid_base_secret_name_is_rejected() {
        let config = SecretsConfig::Literal {
            project: String::new(),
            base_secret_name: "event handler".to_string(),
            secrets: HashMap::new(),
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_resolver_config() {
        let resolver = literal_secrets().resolver_config();
        assert_eq!(resolver.project_name, "local");
        assert_eq!(resolver.base_secret_name, "event-handler");
    }

    #[tokio::test]
    async fn test_literal_provider_serves_secrets() {
        let provider = literal_secrets().build_provider().unwrap();
        let secret = provider
            .get_secret(&SecretName::new("event-handler-team1").unwrap())
            .await
            .unwrap();
        assert_eq!(secret.expose_str(), Some("foo-team1"));
    }

    #[test]
    fn test_secret_manager_provider_is_built() {
        let config = SecretsConfig::SecretManager {
            project: "fourkeys".to_string(),
            base_url: "http://localhost:8085".to_string(),
            base_secret_name: default_base_secret_name(),
            access_token: None,
            request_timeout_seconds: 5,
        };
        assert!(config.build_provider().is_ok());
    }
}

mod queue_config_tests {
    use super::*;

    #[test]
    fn test_pub_sub_requires_project() {
        assert!(matches!(
            QueueConfig::default().validate(),
            Err(ConfigError::Missing { ref key }) if key == "queue.project"
        ));
    }

    #[test]
    fn test_empty_topic_is_invalid() {
        let config = QueueConfig::PubSub {
            project: "fourkeys".to_string(),
            topic: Some(" ".to_string()),
            base_url: default_pubsub_url(),
            access_token: None,
            request_timeout_seconds: 10,
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_publishers_are_built() {
        assert!(QueueConfig::InMemory.build_publisher().is_ok());

        let config = QueueConfig::PubSub {
            project: "fourkeys".to_string(),
            topic: None,
            base_url: "http://localhost:8681".to_string(),
            access_token: None,
            request_timeout_seconds: 10,
        };
        assert!(config.build_publisher().is_ok());
    }
}
