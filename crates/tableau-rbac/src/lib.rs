//! # Tableau RBAC
//!
//! Content model and permission resolution for Tableau Cloud/Server sites.
//!
//! ## Overview
//!
//! The tableau-rbac crate handles:
//! - **Kinds**: Content kinds (project, workbook, data source, view, flow)
//!   and principal kinds (user, group)
//! - **Content**: Items of the content hierarchy
//! - **Capabilities**: Fine-grained permissions and their allow/deny effect
//! - **Templates**: Named capability bundles and their per-kind expansion
//! - **Rules**: Permission rules as reported by the server, and resolved grants
//! - **Resolver**: Template expansion plus conflict resolution
//!
//! ## Architecture
//!
//! ```text
//! PermissionRule = item + grantee + (template | explicit capabilities)
//!        │
//!        ▼  resolve()
//! CapabilityGrant = item + applies_to + grantee + capability + allow/deny
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tableau_rbac::{resolve, Capability, ContentKind, Effect, PermissionRule, PrincipalRef};
//!
//! let rules = vec![PermissionRule::template(
//!     "workbook-1",
//!     ContentKind::Workbook,
//!     PrincipalRef::group("analysts"),
//!     "Viewer",
//! )];
//!
//! let resolution = resolve(&rules);
//! assert_eq!(resolution.grants.len(), 6);
//! assert!(resolution
//!     .grants
//!     .iter()
//!     .all(|g| g.effect == Effect::Allow));
//! assert!(resolution.grants.iter().any(|g| g.capability == Capability::Read));
//! ```
//!
//! ## Precedence
//!
//! - Explicit capability modes override template expansions
//! - Deny overrides allow among rules of the same origin

pub mod capabilities;
pub mod content;
pub mod kinds;
pub mod resolver;
pub mod rules;
pub mod templates;

// Re-export main types for convenience
pub use capabilities::{Capability, Effect};
pub use content::{ContentItem, ContentPermissions};
pub use kinds::{ContentKind, PrincipalKind};
pub use resolver::{resolve, Resolution, ResolveWarning};
pub use rules::{CapabilityGrant, PermissionRule, Principal, PrincipalRef, RuleBody};
pub use templates::Template;
