//! Error types for tradesync
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors with clear error chains.

use std::io;

/// Main error type for the tradesync application
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Credential resolution errors
    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Trading-service API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Database operation errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Failed to establish connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed; carries the failing statement for context
    #[error("Query execution failed for `{statement}`: {message}")]
    QueryFailed { statement: String, message: String },

    /// Not connected to a database
    #[error("Not connected to database")]
    NotConnected,

    /// A schema identifier failed the allow-list check
    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    /// An index symbol outside the supported lookup table
    #[error("Unknown index symbol: {0}")]
    UnknownSymbol(String),
}

impl DbError {
    /// Build a `QueryFailed` from a statement and its underlying driver error.
    pub fn query_failed(statement: &str, err: impl std::fmt::Display) -> Self {
        DbError::QueryFailed {
            statement: statement.to_string(),
            message: err.to_string(),
        }
    }
}

/// Credential resolution errors
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// The store returned no secret payload
    #[error("Secret '{0}' has no payload")]
    Unavailable(String),

    /// The payload could not be decoded into the credential shape
    #[error("Failed to parse secret payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// Underlying secret-store transport failure
    #[error("Secret store error: {0}")]
    Store(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable not set
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Trading-service API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Failed to build or send the HTTP request
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service replied with a non-success status
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("Failed to deserialize API response: {0}")]
    Deserialization(String),
}

/// Specialized Result type for tradesync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for credential operations
pub type SecretResult<T> = std::result::Result<T, SecretError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized Result type for API operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;
