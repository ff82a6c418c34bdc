use crate::config::{AppConfig, AppEnvironment};
use std::fmt;
use tracing::info;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "APP_LOG_LEVEL '{value}' is not a valid tracing filter")
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Install the global fmt subscriber and announce the lifecycle policy it will trace.
///
/// `RUST_LOG` takes precedence over `APP_LOG_LEVEL`. Production output never carries ANSI
/// colours, whatever `APP_LOG_ANSI` says.
pub fn init(config: &AppConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.telemetry.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(use_ansi(config))
        .try_init()
        .map_err(TelemetryError::Subscriber)?;

    info!(
        environment = ?config.environment,
        log_level = %config.telemetry.log_level,
        draft_validation = %config.applications.draft_validation,
        "telemetry installed"
    );
    Ok(())
}

fn level_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(level).map_err(|source| TelemetryError::EnvFilter {
        value: level.to_string(),
        source,
    })
}

fn use_ansi(config: &AppConfig) -> bool {
    config.telemetry.ansi && config.environment != AppEnvironment::Production
}
