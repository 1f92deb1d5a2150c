//! Export error types.

use std::path::PathBuf;

use tableau_client::ApiError;
use thiserror::Error;

/// Errors that stop an export run.
///
/// Per-item failures are not errors; they become
/// [`ExportWarning`](crate::ExportWarning)s and the run continues.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The session was rejected or expired. Nothing is written.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A site-wide request failed and the run cannot continue.
    #[error("Tableau API error: {0}")]
    Api(ApiError),

    /// The request itself is unusable.
    #[error("Invalid export request: {0}")]
    InvalidRequest(String),

    /// Writing an output file failed. No partial file is left behind.
    #[error("Failed to write {path}: {message}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },

    /// Reading a report back failed.
    #[error("Failed to read {path}: {message}")]
    Read {
        /// Source path.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

impl From<ApiError> for ExportError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(message) => ExportError::Auth(message),
            other => ExportError::Api(other),
        }
    }
}

impl ExportError {
    /// Build a write error for `path`.
    pub fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ExportError::Write {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Build a read error for `path`.
    pub fn read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ExportError::Read {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether the run stopped because of authentication.
    pub fn is_auth(&self) -> bool {
        matches!(self, ExportError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_map_to_auth() {
        let err = ExportError::from(ApiError::Auth("token expired".into()));
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "Authentication failed: token expired");
    }

    #[test]
    fn test_other_api_errors_are_wrapped() {
        let err = ExportError::from(ApiError::from_status(500, "boom".into()));
        assert!(matches!(err, ExportError::Api(ApiError::Transient { status: 500, .. })));
    }

    #[test]
    fn test_write_error_names_path() {
        let err = ExportError::write("/tmp/out.csv", "disk full");
        assert_eq!(err.to_string(), "Failed to write /tmp/out.csv: disk full");
    }
}
