//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// When absent the service runs with the fixture delegate.
    pub openai_api_key: Option<String>,
    pub contract_model: String,
    pub ai_timeout: Duration,
    pub upload_dir: PathBuf,
    pub export_dir: PathBuf,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var_or(name, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name.to_string())),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server and Database ---
        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", "0.0.0.0:3000")?;
        let database_url = required_var("DATABASE_URL")?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Authentication ---
        let jwt_secret = required_var("JWT_SECRET")?;
        let token_ttl_hours = parse_var::<i64>("TOKEN_TTL_HOURS", "24")?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_HOURS".to_string(),
                "must be a positive number of hours".to_string(),
            ));
        }

        // --- AI Delegate ---
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let contract_model = var_or("CONTRACT_MODEL", "gpt-4");
        let ai_timeout = Duration::from_secs(parse_var::<u64>("AI_TIMEOUT_SECS", "60")?);

        // --- Files and HTTP ---
        let upload_dir = PathBuf::from(var_or("UPLOAD_DIR", "./uploads"));
        let export_dir = PathBuf::from(var_or("EXPORT_DIR", "./exports"));
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:5173");
        let max_upload_bytes = parse_var::<usize>("MAX_UPLOAD_BYTES", "10485760")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            token_ttl_hours,
            openai_api_key,
            contract_model,
            ai_timeout,
            upload_dir,
            export_dir,
            cors_origin,
            max_upload_bytes,
        })
    }

    /// Settings for running the router without a database or network, as
    /// the integration tests do.
    pub fn for_tests(upload_dir: PathBuf, export_dir: PathBuf) -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: String::new(),
            log_level: Level::DEBUG,
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 24,
            openai_api_key: None,
            contract_model: "gpt-4".to_string(),
            ai_timeout: Duration::from_secs(5),
            upload_dir,
            export_dir,
            cors_origin: "http://localhost:5173".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}
