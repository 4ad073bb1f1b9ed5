//! Runtime settings
//!
//! All settings come from the environment (with a `.env` file honored for local
//! runs). In the deployed environment the variables are provisioned externally.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Header name carrying the shared API key on collaborator calls
pub const API_KEY_HEADER: &str = "api-key";

/// SSL connection mode for the database session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl SslMode {
    fn parse(value: &str) -> ConfigResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(ConfigError::Invalid(format!(
                "unrecognized ssl mode '{other}' (expected disable, prefer or require)"
            ))),
        }
    }
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the upstream trading service
    pub service_base_url: String,

    /// Shared API key sent on collaborator calls
    pub service_api_key: String,

    /// Secrets Manager name holding the database credentials
    pub db_secret_name: String,

    /// AWS region for the secret store
    pub aws_region: String,

    /// Database to connect to
    pub database: String,

    /// SSL mode for database sessions
    pub ssl_mode: SslMode,

    /// Bound on connection establishment
    pub connect_timeout: Duration,

    /// Whether statements self-commit by default
    pub autocommit: bool,
}

fn required(name: &str) -> ConfigResult<String> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// `SERVICE_BASE_URL`, `SERVICE_API_KEY` and `DB_SECRET_NAME` are required;
    /// everything else has a sensible default.
    pub fn from_env() -> ConfigResult<Self> {
        let connect_timeout_secs = match env::var("DB_CONNECT_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("DB_CONNECT_TIMEOUT_SECS must be an integer, got '{raw}'"))
            })?,
            Err(_) => 10,
        };

        let ssl_mode = match env::var("DB_SSL_MODE") {
            Ok(raw) => SslMode::parse(&raw)?,
            Err(_) => SslMode::default(),
        };

        let autocommit = match env::var("DB_AUTOCOMMIT") {
            Ok(raw) => raw.parse::<bool>().map_err(|_| {
                ConfigError::Invalid(format!("DB_AUTOCOMMIT must be true or false, got '{raw}'"))
            })?,
            Err(_) => true,
        };

        Ok(Settings {
            service_base_url: required("SERVICE_BASE_URL")?,
            service_api_key: required("SERVICE_API_KEY")?,
            db_secret_name: required("DB_SECRET_NAME")?,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            database: env::var("DB_NAME").unwrap_or_else(|_| "ibkr".to_string()),
            ssl_mode,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            autocommit,
        })
    }
}
