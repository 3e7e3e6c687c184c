//! Crate-level error types.
//!
//! Aggregates configuration and API errors behind one type with
//! user-friendly messages, so embedding applications can surface failures
//! without matching on every layer themselves.

use thiserror::Error;

use crate::api::error::ApiError;
use crate::config::ConfigError;

/// The top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors. Fatal: surfaced at construction time.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// A message suitable for showing to users, without technical jargon.
    pub fn user_message(&self) -> String {
        match self {
            Error::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::Read(_) => {
                    "Could not read configuration file. Please check the file exists and is readable."
                        .to_string()
                }
                ConfigError::Parse(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::Validation(msg) => format!("Configuration error: {}", msg),
            },
            Error::Api(e) => match e {
                ApiError::Validation(msg) => format!("Invalid input: {}", msg),
                ApiError::Unauthorized => {
                    "Authentication failed. Please check your principal and secret.".to_string()
                }
                ApiError::Forbidden => {
                    "Access denied. You don't have permission to access this resource.".to_string()
                }
                ApiError::NotFound(resource) => format!("'{}' was not found.", resource),
                ApiError::RateLimited => {
                    "Too many requests. Please wait a moment and try again.".to_string()
                }
                ApiError::Server(_) => "Tracker server error. Please try again later.".to_string(),
                ApiError::Network(_) => {
                    "Connection failed. Please check your internet connection.".to_string()
                }
                ApiError::Internal(_) => {
                    "Unexpected response from the tracker. Please try again.".to_string()
                }
            },
            Error::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
        }
    }

    /// Whether the operation can simply be retried later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Api(e) if e.is_retryable())
    }
}

/// Result type for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;
