//! # Event-Gate Service
//!
//! Binary entry point for the Event-Gate webhook gateway.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Starts the HTTP server from event-gate-api

use anyhow::Context;
use config::{builder::DefaultState, ConfigBuilder};
use event_gate_api::{start_server, LoggingConfig, ServiceConfig, ServiceError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming an extra configuration file
const CONFIG_FILE_ENV: &str = "EVENT_GATE_CONFIG_FILE";

/// Prefix of configuration environment variables, e.g. `EG__SERVER__PORT`
const ENV_PREFIX: &str = "EG";

const EXIT_CONFIGURATION: i32 = 3;

#[tokio::main]
async fn main() {
    // Sources, later ones override earlier ones:
    //  1. /etc/event-gate/service.yaml
    //  2. ./config/service.yaml
    //  3. the file named by EVENT_GATE_CONFIG_FILE
    //  4. EG__ prefixed environment variables
    let explicit_path = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|path| !path.is_empty());
    let loaded = default_sources(explicit_path.as_deref())
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .context("failed to read configuration sources")
        .and_then(into_service_config);

    let service_config = match loaded {
        Ok(service_config) => service_config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!(error = %format_args!("{:#}", e), "Service configuration is invalid; aborting");
            std::process::exit(EXIT_CONFIGURATION);
        }
    };

    init_logging(&service_config.logging);

    if let Some(path) = explicit_path {
        info!(path = %path, "Loaded configuration from explicit path");
    }
    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        "Starting Event-Gate service"
    );

    if let Err(e) = start_server(service_config).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => EXIT_CONFIGURATION,
        };

        std::process::exit(exit_code);
    }
}

fn default_sources(explicit_path: Option<&str>) -> ConfigBuilder<DefaultState> {
    let builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/event-gate/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    match explicit_path {
        Some(path) => builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        ),
        None => builder,
    }
}

/// Deserialize and validate the merged configuration.
fn into_service_config(config: config::Config) -> anyhow::Result<ServiceConfig> {
    let service_config: ServiceConfig = config
        .try_deserialize()
        .context("could not deserialize service configuration")?;
    service_config
        .validate()
        .context("service configuration failed validation")?;
    Ok(service_config)
}

/// `RUST_LOG` wins over the configured level.
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

fn init_logging(logging: &LoggingConfig) {
    let json = logging.json_format;
    tracing_subscriber::registry()
        .with(env_filter(logging))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
