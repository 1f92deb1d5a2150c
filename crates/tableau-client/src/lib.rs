//! # Tableau Client
//!
//! Read-only client for the Tableau Cloud/Server REST API.
//!
//! ## Overview
//!
//! The tableau-client crate handles:
//! - **Configuration**: Server URL (or pod name), API version, timeouts,
//!   page size and retry settings, from code or environment variables
//! - **Sessions**: Personal-access-token sign-in producing an explicit
//!   [`Site`] handle, and best-effort sign-out
//! - **Listing**: Lazy, transparently paginated content streams
//! - **Permissions**: Item permissions and project default permissions,
//!   converted into [`PermissionRule`](tableau_rbac::PermissionRule)s
//! - **Principals**: Users, groups and group membership
//! - **Retries**: Exponential backoff for rate-limited and transient failures
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tableau_client::{ClientConfig, ContentApi, Session};
//! use tableau_rbac::ContentKind;
//!
//! # async fn example() -> Result<(), tableau_client::ApiError> {
//! let session = Session::sign_in(ClientConfig::new("10ax"), "exporter", "secret", "sales").await?;
//! let projects = session.list_all(ContentKind::Project, None).await?;
//! for project in &projects {
//!     let rules = session.get_permissions(project).await?;
//!     println!("{}: {} rules", project.name, rules.len());
//! }
//! session.sign_out().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! HTTP statuses map onto [`ApiError`]: 401 is `Auth`, 403 `Forbidden`,
//! 404 `NotFound`, 429 `RateLimited` and 5xx `Transient`. Only the last two,
//! plus timeouts and connection failures, are retried.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod site;
pub mod wire;

// Re-export main types for convenience
pub use api::{ContentApi, Session};
pub use client::TableauClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ApiResult};
pub use retry::RetryConfig;
pub use site::Site;
