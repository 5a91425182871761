use crate::features::AlignmentMode;
use crate::prediction::RetryPolicy;
use crate::telemetry::LogFormat;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SCHEMA_PATH: &str = "model/churn_model_columns.json";
const DEFAULT_MODEL_PATH: &str = "model/churn_predictor.json";

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
    pub features: FeaturesConfig,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = parse_var("APP_LOG_FORMAT", LogFormat::Compact)?;

        let features = FeaturesConfig {
            schema_path: env::var("CHURN_SCHEMA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCHEMA_PATH)),
            mode: parse_var("CHURN_ALIGNMENT_MODE", AlignmentMode::OneHot)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            features,
            scoring: ScoringConfig::from_env()?,
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

/// Log filtering and output shape.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Where the training-time column order lives and how numerics are fed.
#[derive(Debug, Clone)]
pub struct FeaturesConfig {
    pub schema_path: PathBuf,
    pub mode: AlignmentMode,
}

/// Which classifier scores aligned vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringConfig {
    Local {
        model_path: PathBuf,
    },
    Remote {
        endpoint: String,
        timeout: Duration,
        retry: RetryPolicy,
    },
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = env::var("CHURN_BACKEND").unwrap_or_else(|_| "local".to_string());
        match backend.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local {
                model_path: env::var("CHURN_MODEL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH)),
            }),
            "remote" => {
                let endpoint = env::var("CHURN_SCORING_URL")
                    .ok()
                    .filter(|value| !value.trim().is_empty())
                    .ok_or(ConfigError::MissingValue {
                        key: "CHURN_SCORING_URL",
                    })?;
                let timeout = Duration::from_millis(parse_var("CHURN_SCORING_TIMEOUT_MS", 5_000)?);
                let defaults = RetryPolicy::default();
                let retry = RetryPolicy {
                    max_attempts: parse_var("CHURN_SCORING_MAX_ATTEMPTS", defaults.max_attempts)?,
                    min_backoff: Duration::from_millis(parse_var(
                        "CHURN_SCORING_MIN_BACKOFF_MS",
                        defaults.min_backoff.as_millis() as u64,
                    )?),
                    max_backoff: Duration::from_millis(parse_var(
                        "CHURN_SCORING_MAX_BACKOFF_MS",
                        defaults.max_backoff.as_millis() as u64,
                    )?),
                    multiplier: defaults.multiplier,
                };
                Ok(Self::Remote {
                    endpoint,
                    timeout,
                    retry,
                })
            }
            _ => Err(ConfigError::InvalidValue {
                key: "CHURN_BACKEND",
                value: backend,
            }),
        }
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    MissingValue { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an unsupported value '{value}'")
            }
            ConfigError::MissingValue { key } => {
                write!(f, "{key} must be set for the selected scoring backend")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::MissingValue { .. } => None,
        }
    }
}

/// Held by every unit test that reads or writes process environment variables.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}
