//! # Tableau Permission Export
//!
//! Walks a Tableau site from a set of root projects, resolves the effective
//! permissions of every item and writes them to a CSV report.
//!
//! ## Pipeline
//!
//! ```text
//! ContentWalker ──► items (DFS, path-qualified)
//!        │
//!        ▼  get_permissions, N at a time
//! resolve() ──► CapabilityGrant per item
//!        │
//!        ▼  optional
//! MembershipFetcher ──► one row per group member
//!        │
//!        ▼
//! write_report() ──► sorted CSV, written atomically
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tableau_client::{ClientConfig, Session};
//! use tableau_export::{ExportRequest, Exporter, RootSelection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::sign_in(ClientConfig::new("10ax"), "token", "secret", "finance").await?;
//! let request = ExportRequest::new(RootSelection::All, "finance.csv").with_group_members(true);
//! let summary = Exporter::new(&session).run(&request).await?;
//! println!("{} rows, {} warnings", summary.rows, summary.warnings.len());
//! session.sign_out().await;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod membership;
pub mod progress;
pub mod report;
pub mod walker;
pub mod warnings;

// Re-export main types for convenience
pub use error::{ExportError, ExportResult};
pub use exporter::{ExportRequest, ExportSummary, Exporter, DEFAULT_CONCURRENCY};
pub use membership::{MembershipFetcher, Memberships, PrincipalDirectory};
pub use progress::{progress_channel, CancelFlag, ProgressEvent, ProgressReceiver, ProgressSender};
pub use report::{read_report, write_report, GroupMemberRow, ReportRow};
pub use walker::{ContentWalker, ProjectNode, RootSelection, Walk, WalkedItem};
pub use warnings::{write_warnings, ExportWarning};
