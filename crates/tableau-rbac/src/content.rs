//! # Content Items
//!
//! Nodes of a site's content hierarchy. Every item except a top-level
//! project belongs to exactly one parent project; views additionally point at
//! the workbook they live in.
//!
//! A project's [`ContentPermissions`] mode decides whether the rules set on
//! the content inside it take effect at all.

use serde::{Deserialize, Serialize};

use crate::kinds::ContentKind;

/// How a project governs the permissions of the content it holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentPermissions {
    /// Only the project's default rules apply, in this project and below.
    LockedToProject,
    /// Locked for this project only; nested projects manage their own.
    LockedToProjectWithoutNested,
    /// Item owners may set rules on their content.
    ManagedByOwner,
}

impl ContentPermissions {
    /// Name used by the REST API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentPermissions::LockedToProject => "LockedToProject",
            ContentPermissions::LockedToProjectWithoutNested => "LockedToProjectWithoutNested",
            ContentPermissions::ManagedByOwner => "ManagedByOwner",
        }
    }

    /// Parse the REST API name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lockedtoproject" => Some(ContentPermissions::LockedToProject),
            "lockedtoprojectwithoutnested" => Some(ContentPermissions::LockedToProjectWithoutNested),
            "managedbyowner" => Some(ContentPermissions::ManagedByOwner),
            _ => None,
        }
    }

    /// Whether rules set on individual items are ignored.
    pub fn is_locked(&self) -> bool {
        !matches!(self, ContentPermissions::ManagedByOwner)
    }
}

impl std::fmt::Display for ContentPermissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project, workbook, data source, view or flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentItem {
    /// Item ID (a LUID on the server).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Kind of content.
    pub kind: ContentKind,
    /// Parent project. `None` for top-level projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_project_id: Option<String>,
    /// Workbook a view belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workbook_id: Option<String>,
    /// Owner user ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Permission mode. Only set on projects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_permissions: Option<ContentPermissions>,
}

impl ContentItem {
    /// Create an item with no parent and no owner.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_project_id: None,
            workbook_id: None,
            owner_id: None,
            content_permissions: None,
        }
    }

    /// Set the parent project.
    pub fn with_parent(mut self, project_id: impl Into<String>) -> Self {
        self.parent_project_id = Some(project_id.into());
        self
    }

    /// Set the workbook a view belongs to.
    pub fn with_workbook(mut self, workbook_id: impl Into<String>) -> Self {
        self.workbook_id = Some(workbook_id.into());
        self
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Set a project's permission mode.
    pub fn with_content_permissions(mut self, mode: ContentPermissions) -> Self {
        self.content_permissions = Some(mode);
        self
    }

    /// Whether this is a project with no parent.
    pub fn is_top_level_project(&self) -> bool {
        self.kind == ContentKind::Project && self.parent_project_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let view = ContentItem::new("v1", "Overview", ContentKind::View)
            .with_parent("p1")
            .with_workbook("w1")
            .with_owner("u1");
        assert_eq!(view.parent_project_id.as_deref(), Some("p1"));
        assert_eq!(view.workbook_id.as_deref(), Some("w1"));
        assert_eq!(view.owner_id.as_deref(), Some("u1"));
        assert!(!view.is_top_level_project());
    }

    #[test]
    fn test_top_level_project() {
        let root = ContentItem::new("p1", "Sales", ContentKind::Project);
        assert!(root.is_top_level_project());
        let nested = root.clone().with_parent("p0");
        assert!(!nested.is_top_level_project());
    }

    #[test]
    fn test_content_permissions_parse() {
        assert_eq!(
            ContentPermissions::parse("LockedToProject"),
            Some(ContentPermissions::LockedToProject)
        );
        assert_eq!(
            ContentPermissions::parse("managedbyowner"),
            Some(ContentPermissions::ManagedByOwner)
        );
        assert_eq!(ContentPermissions::parse(""), None);
        assert!(ContentPermissions::LockedToProjectWithoutNested.is_locked());
        assert!(!ContentPermissions::ManagedByOwner.is_locked());
        assert_eq!(
            ContentPermissions::LockedToProjectWithoutNested.to_string(),
            "LockedToProjectWithoutNested"
        );
    }
}
