//! Core error types for prioritycards-core.
//!
//! This module defines the error hierarchy using thiserror. Each concern
//! (remote service, configuration, session storage, authentication,
//! validation) has its own enum; [`CoreError`] wraps them all.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for prioritycards-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Remote CRUD service errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session storage errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by (or while talking to) the remote CRUD service.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Non-success HTTP status with the backend's message.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The query matched no row.
    #[error("No matching row")]
    NotFound,

    /// A database constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Transport failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A row could not be mapped to or from the remote schema.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service answered with something that is not a row set.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service refused to serve the request.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The backend URL could not be used to build a request.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home/config directory could not be prepared
    #[error("Config directory unavailable: {0}")]
    DirUnavailable(#[from] std::io::Error),
}

/// Session storage errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// OS keyring failure
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Session payload could not be serialized
    #[error("Session payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Backend-specific failure
    #[error("{0}")]
    Backend(String),
}

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Username/password pair did not match exactly one credential row
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The credential check could not be performed
    #[error("Credential check failed: {0}")]
    Remote(#[from] RemoteError),

    /// The authenticated session could not be persisted or cleared
    #[error("Session storage failed: {0}")]
    Session(#[from] SessionError),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl RemoteError {
    /// Whether this error means "the row does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound)
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_wraps_remote_error() {
        let err: AuthError = RemoteError::NotFound.into();
        assert!(matches!(err, AuthError::Remote(RemoteError::NotFound)));
        assert_eq!(err.to_string(), "Credential check failed: No matching row");
    }

    #[test]
    fn validation_error_message_names_field() {
        let err = ValidationError::invalid("urgency", "must be between 1 and 10");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'urgency': must be between 1 and 10"
        );
    }

    #[test]
    fn core_error_from_http_error() {
        let err: CoreError = RemoteError::Http {
            status: 503,
            message: "down".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Remote error: HTTP 503: down");
    }
}
