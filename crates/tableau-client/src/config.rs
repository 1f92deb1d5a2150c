//! Client configuration.
//!
//! Holds the server address, REST API version, timeouts, page size and
//! retry settings. Configuration can be built in code or loaded from
//! environment variables with defaults matching Tableau Cloud.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryConfig;

/// Largest page size the REST API accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required setting.
    #[error("Missing required setting: {0}")]
    Missing(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration for [`TableauClient`](crate::TableauClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server root URL, e.g. `https://10ax.online.tableau.com`.
    pub server_url: String,

    /// REST API version, e.g. `3.23`.
    pub api_version: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Items requested per page when listing.
    pub page_size: u32,

    /// Retries after the first attempt for rate-limited or transient failures.
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds.
    pub retry_initial_delay_ms: u64,

    /// Upper bound for a retry delay, in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            api_version: "3.23".to_string(),
            timeout_secs: 30,
            page_size: 100,
            max_retries: 3,
            retry_initial_delay_ms: 500,
            retry_max_delay_ms: 30_000,
        }
    }
}

impl ClientConfig {
    /// Configuration for a server, with defaults for everything else.
    ///
    /// `server` may be a full URL or a Tableau Cloud pod name (`10ax`).
    pub fn new(server: &str) -> Self {
        Self {
            server_url: normalize_server_url(server),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TABLEAU_SERVER`: server URL or pod name (no default)
    /// - `TABLEAU_API_VERSION`: REST API version (default: 3.23)
    /// - `TABLEAU_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    /// - `TABLEAU_PAGE_SIZE`: page size for listings (default: 100)
    /// - `TABLEAU_MAX_RETRIES`: retries for transient failures (default: 3)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            server_url: std::env::var("TABLEAU_SERVER")
                .map(|s| normalize_server_url(&s))
                .unwrap_or(default.server_url),
            api_version: std::env::var("TABLEAU_API_VERSION").unwrap_or(default.api_version),
            timeout_secs: std::env::var("TABLEAU_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.timeout_secs),
            page_size: std::env::var("TABLEAU_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.page_size),
            max_retries: std::env::var("TABLEAU_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_retries),
            retry_initial_delay_ms: default.retry_initial_delay_ms,
            retry_max_delay_ms: default.retry_max_delay_ms,
        }
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry policy derived from this configuration.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            ..RetryConfig::with_max_retries(self.max_retries)
        }
    }

    /// Root of the versioned REST API, e.g. `https://host/api/3.23`.
    pub fn api_base(&self) -> String {
        format!(
            "{}/api/{}",
            self.server_url.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Check that the configuration can be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::Missing("TABLEAU_SERVER".to_string()));
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "server_url".to_string(),
                message: format!("'{}' is not an http(s) URL", self.server_url),
            });
        }
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::Missing("TABLEAU_API_VERSION".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                key: "page_size".to_string(),
                message: format!("must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }
        Ok(())
    }
}

/// Turn a server argument into a root URL.
///
/// Full URLs are kept (minus trailing slashes); anything else is taken as a
/// Tableau Cloud pod name.
///
/// # Example
///
/// ```
/// use tableau_client::config::normalize_server_url;
///
/// assert_eq!(normalize_server_url("10ax"), "https://10ax.online.tableau.com");
/// assert_eq!(
///     normalize_server_url("https://tableau.example.com/"),
///     "https://tableau.example.com"
/// );
/// ```
pub fn normalize_server_url(server: &str) -> String {
    let server = server.trim();
    if server.is_empty() {
        return String::new();
    }
    if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("https://{}.online.tableau.com", server.trim_end_matches('/'))
    }
}
