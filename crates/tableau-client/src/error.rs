//! Error types for REST API operations.

use thiserror::Error;

use crate::config::ConfigError;

/// REST API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Credentials were rejected, the session expired, or the server could
    /// not be reached while signing in.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The signed-in user may not read this resource.
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// The resource does not exist (deleted or moved).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server asked us to slow down.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Server-side failure that may succeed on retry.
    #[error("Server error ({status}): {message}")]
    Transient {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Client configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for REST API operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits, 5xx responses, timeouts and connection failures are
    /// retryable; everything else is returned immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited(_) | ApiError::Transient { .. } => true,
            ApiError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether the error invalidates the whole session.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// Whether the resource is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Auth(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited(_) => Some(429),
            ApiError::Transient { status, .. } | ApiError::Api { status, .. } => Some(*status),
            ApiError::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) | ApiError::Config(_) => None,
        }
    }

    /// Map an unsuccessful HTTP status to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => ApiError::Auth(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited(message),
            500..=599 => ApiError::Transient { status, message },
            _ => ApiError::Api { status, message },
        }
    }
}
