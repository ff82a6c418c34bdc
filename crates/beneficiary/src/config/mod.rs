use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::applications::{Credentials, DraftValidationMode};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub applications: ApplicationsConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ansi = match env::var("APP_LOG_ANSI") {
            Ok(value) => parse_flag(&value).ok_or(ConfigError::InvalidLogAnsi { value })?,
            Err(_) => false,
        };

        let draft_validation = match env::var("APP_DRAFT_VALIDATION") {
            Ok(value) => value
                .parse::<DraftValidationMode>()
                .map_err(|_| ConfigError::InvalidDraftValidation { value })?,
            Err(_) => DraftValidationMode::default(),
        };

        let users = match env::var("APP_USERS") {
            Ok(value) => parse_users(&value)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            applications: ApplicationsConfig { draft_validation },
            auth: AuthConfig { users },
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `name:password` pairs separated by commas. Blank entries are ignored.
fn parse_users(value: &str) -> Result<Vec<Credentials>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((username, password)) if !username.trim().is_empty() => {
                Ok(Credentials::new(username.trim(), password))
            }
            _ => Err(ConfigError::InvalidUsers {
                entry: entry.to_string(),
            }),
        })
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Lifecycle policy knobs.
#[derive(Debug, Clone, Default)]
pub struct ApplicationsConfig {
    pub draft_validation: DraftValidationMode,
}

/// Accounts accepted by Basic authentication, in id order.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub users: Vec<Credentials>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogAnsi { value: String },
    InvalidDraftValidation { value: String },
    InvalidUsers { entry: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogAnsi { value } => {
                write!(f, "APP_LOG_ANSI must be true or false, got '{value}'")
            }
            ConfigError::InvalidDraftValidation { value } => write!(
                f,
                "APP_DRAFT_VALIDATION must be 'advisory' or 'strict', got '{value}'"
            ),
            ConfigError::InvalidUsers { entry } => {
                write!(f, "APP_USERS entry '{entry}' must look like name:password")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogAnsi { .. }
            | ConfigError::InvalidDraftValidation { .. }
            | ConfigError::InvalidUsers { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_ANSI",
            "APP_DRAFT_VALIDATION",
            "APP_USERS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.telemetry.ansi);
        assert_eq!(
            config.applications.draft_validation,
            DraftValidationMode::Advisory
        );
        assert!(config.auth.users.is_empty());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_draft_mode_and_users() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DRAFT_VALIDATION", "Strict");
        env::set_var("APP_USERS", "asha:s3cret, ravi:pa:ss ,");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(
            config.applications.draft_validation,
            DraftValidationMode::Strict
        );
        assert_eq!(
            config.auth.users,
            vec![
                Credentials::new("asha", "s3cret"),
                Credentials::new("ravi", "pa:ss"),
            ]
        );
    }

    #[test]
    fn rejects_unknown_draft_mode() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DRAFT_VALIDATION", "lenient");
        let error = AppConfig::load().expect_err("unknown mode rejected");
        reset_env();

        assert!(matches!(
            error,
            ConfigError::InvalidDraftValidation { ref value } if value == "lenient"
        ));
    }

    #[test]
    fn rejects_user_entries_without_password_separator() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_USERS", "asha");
        let error = AppConfig::load().expect_err("malformed users rejected");
        reset_env();

        assert!(error.to_string().contains("'asha'"));
    }
}
