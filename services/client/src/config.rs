use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where remote calls go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// The deployed HQ HTTP API.
    Http,
    /// The in-process fallback service.
    Offline,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub backend: Backend,
    /// Base URL of the HQ API, without a trailing slash.
    pub api_endpoint: Option<String>,
    pub request_timeout: Duration,
    /// How long an answered round stays up before "Next Scenario" appears.
    pub next_round_delay: Duration,
    /// Identity to start signed in as.
    pub username: Option<String>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_backend(None)
    }

    /// Like `from_env`, but a backend chosen on the command line wins over
    /// `HQ_BACKEND`.
    pub fn from_env_with_backend(backend: Option<Backend>) -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let backend = match backend {
            Some(backend) => backend,
            None => {
                let backend_str =
                    std::env::var("HQ_BACKEND").unwrap_or_else(|_| "http".to_string());
                match backend_str.to_lowercase().as_str() {
                    "http" => Backend::Http,
                    "offline" => Backend::Offline,
                    other => {
                        return Err(ConfigError::InvalidValue(
                            "HQ_BACKEND".to_string(),
                            format!("'{}' is not one of 'http', 'offline'", other),
                        ));
                    }
                }
            }
        };

        let api_endpoint = match std::env::var("HQ_API_ENDPOINT") {
            Ok(raw) => Some(parse_endpoint(&raw)?),
            Err(_) => None,
        };
        if backend == Backend::Http && api_endpoint.is_none() {
            return Err(ConfigError::MissingVar(
                "HQ_API_ENDPOINT must be set for 'http' backend".to_string(),
            ));
        }

        let request_timeout =
            Duration::from_secs(parse_number("HQ_REQUEST_TIMEOUT_SECS", 30)?);
        let next_round_delay =
            Duration::from_millis(parse_number("HQ_NEXT_ROUND_DELAY_MS", 1500)?);

        let username = std::env::var("HQ_USERNAME")
            .ok()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            backend,
            api_endpoint,
            request_timeout,
            next_round_delay,
            username,
            log_level,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue("HQ_API_ENDPOINT".to_string(), reason);
    let url = reqwest::Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_number(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(var.to_string(), format!("'{}' is not a number", raw))
        }),
        Err(_) => Ok(default),
    }
}
