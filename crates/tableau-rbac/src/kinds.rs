//! # Content and Principal Kinds
//!
//! Defines the kinds of content that carry permissions on a Tableau site and
//! the kinds of principals permissions are granted to.

use serde::{Deserialize, Serialize};

/// Kind of content item that permissions can be assigned on.
///
/// The declaration order is the order used when sorting report rows:
/// projects first, then the content that lives inside them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// A project (folder). Projects nest and own all other content.
    Project,
    /// A workbook published into a project.
    Workbook,
    /// A published data source.
    Datasource,
    /// A view (sheet or dashboard) inside a workbook.
    View,
    /// A Tableau Prep flow.
    Flow,
}

impl ContentKind {
    /// Get the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Project => "project",
            ContentKind::Workbook => "workbook",
            ContentKind::Datasource => "datasource",
            ContentKind::View => "view",
            ContentKind::Flow => "flow",
        }
    }

    /// Path segment of the REST collection for this kind (e.g. `workbooks`).
    pub fn collection(&self) -> &'static str {
        match self {
            ContentKind::Project => "projects",
            ContentKind::Workbook => "workbooks",
            ContentKind::Datasource => "datasources",
            ContentKind::View => "views",
            ContentKind::Flow => "flows",
        }
    }

    /// Human-readable label, as shown on the permission dialog tabs.
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Project => "Projects",
            ContentKind::Workbook => "Workbooks",
            ContentKind::Datasource => "Data Sources",
            ContentKind::View => "Views",
            ContentKind::Flow => "Flows",
        }
    }

    /// Parse a kind from its string representation.
    ///
    /// Accepts singular and plural forms and the `data_source` spelling.
    ///
    /// # Example
    ///
    /// ```
    /// use tableau_rbac::ContentKind;
    ///
    /// assert_eq!(ContentKind::parse("workbooks"), Some(ContentKind::Workbook));
    /// assert_eq!(ContentKind::parse("Data_Source"), Some(ContentKind::Datasource));
    /// assert_eq!(ContentKind::parse("lens"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "project" | "projects" => Some(ContentKind::Project),
            "workbook" | "workbooks" => Some(ContentKind::Workbook),
            "datasource" | "datasources" | "data_source" | "data_sources" | "data-source" => {
                Some(ContentKind::Datasource)
            }
            "view" | "views" | "sheet" | "sheets" => Some(ContentKind::View),
            "flow" | "flows" => Some(ContentKind::Flow),
            _ => None,
        }
    }

    /// All content kinds, in sort order.
    pub fn all() -> &'static [ContentKind] {
        &[
            ContentKind::Project,
            ContentKind::Workbook,
            ContentKind::Datasource,
            ContentKind::View,
            ContentKind::Flow,
        ]
    }

    /// Kinds a project can hold default permissions for.
    pub fn default_permission_kinds() -> &'static [ContentKind] {
        &[ContentKind::Workbook, ContentKind::Datasource, ContentKind::Flow]
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of principal a permission is granted to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// A single site user.
    User,
    /// A group of users.
    Group,
}

impl PrincipalKind {
    /// Get the string representation of the principal kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
        }
    }

    /// Parse a principal kind (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(PrincipalKind::User),
            "group" => Some(PrincipalKind::Group),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
