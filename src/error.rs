//! Error types for anihub.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the hosted profile backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{operation} request failed: {reason}")]
    Request { operation: String, reason: String },

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub(crate) fn request(operation: &str, err: impl std::fmt::Display) -> Self {
        Self::Request {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn invalid_response(operation: &str, err: impl std::fmt::Display) -> Self {
        Self::InvalidResponse {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
