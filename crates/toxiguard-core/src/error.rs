//! Error types for Toxiguard

use std::time::Duration;

/// Result type alias using Toxiguard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Toxiguard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or unrecognized API key
    #[error("unauthorized: missing or invalid API key")]
    Unauthorized,

    /// Admission denied by the rate limiter
    #[error("rate limit exceeded, retry after {}s", retry_after.as_secs())]
    RateLimited {
        /// Time until the current window closes
        retry_after: Duration,
    },

    /// The classifier artifact failed to load, or the scorer failed
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Batch over the size cap, or malformed payload
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Scoring did not complete before the deadline
    #[error("operation timed out")]
    Timeout,

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model-unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable snake-case name of the error kind, used in responses and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::InvalidInput(_) => "invalid_input",
            Self::Timeout => "timeout",
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => "internal_error",
        }
    }
}
