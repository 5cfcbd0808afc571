use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::procurement::OrganizationId;

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
    pub directory: DirectoryConfig,
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
        let format = LogFormat::parse(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        let directory = DirectoryConfig::parse(
            &env::var("APP_RESPONSIBLE_EMPLOYEES").unwrap_or_default(),
        )?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            directory,
        })
    }
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

/// Output layout of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidLogFormat {
                value: other.to_string(),
            }),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// An employee registered as responsible for an organization at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsibleEmployee {
    pub organization_id: OrganizationId,
    pub username: String,
}

/// Principals seeded into the organization directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub responsible: Vec<ResponsibleEmployee>,
}

impl DirectoryConfig {
    /// Parse a comma separated `organizationId:username` list.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let mut responsible = Vec::new();
        for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let invalid = || ConfigError::InvalidResponsibleEmployee {
                entry: entry.to_string(),
            };
            let (organization, username) = entry.split_once(':').ok_or_else(invalid)?;
            let organization_id = organization
                .trim()
                .parse::<i64>()
                .map(OrganizationId)
                .map_err(|_| invalid())?;
            let username = username.trim();
            if username.is_empty() {
                return Err(invalid());
            }
            responsible.push(ResponsibleEmployee {
                organization_id,
                username: username.to_string(),
            });
        }
        Ok(Self { responsible })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat { value: String },
    InvalidResponsibleEmployee { entry: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json', got '{}'", value)
            }
            ConfigError::InvalidResponsibleEmployee { entry } => write!(
                f,
                "APP_RESPONSIBLE_EMPLOYEES entry '{}' must look like 'organizationId:username'",
                entry
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogFormat { .. }
            | ConfigError::InvalidResponsibleEmployee { .. } => None,
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_LOG_FORMAT");
        env::remove_var("APP_RESPONSIBLE_EMPLOYEES");
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
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert!(config.directory.responsible.is_empty());
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
    fn rejects_unknown_log_format() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_LOG_FORMAT", "pretty");
        let err = AppConfig::load().expect_err("format rejected");
        assert!(matches!(err, ConfigError::InvalidLogFormat { ref value } if value == "pretty"));
        reset_env();
    }

    #[test]
    fn reads_responsible_employees_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_LOG_FORMAT", "JSON");
        env::set_var("APP_RESPONSIBLE_EMPLOYEES", "7:alice, 7:bob,9:carol");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.telemetry.format, LogFormat::Json);
        assert_eq!(
            config.directory.responsible,
            vec![
                ResponsibleEmployee {
                    organization_id: OrganizationId(7),
                    username: "alice".to_string(),
                },
                ResponsibleEmployee {
                    organization_id: OrganizationId(7),
                    username: "bob".to_string(),
                },
                ResponsibleEmployee {
                    organization_id: OrganizationId(9),
                    username: "carol".to_string(),
                },
            ]
        );
    }

    #[test]
    fn malformed_employee_entries_are_rejected() {
        for raw in ["alice", "x:alice", "7:", "7:alice,:bob"] {
            let err = DirectoryConfig::parse(raw).expect_err("entry rejected");
            assert!(matches!(err, ConfigError::InvalidResponsibleEmployee { .. }));
        }
        assert_eq!(
            DirectoryConfig::parse(" , ").expect("blank list"),
            DirectoryConfig::default()
        );
    }
}
