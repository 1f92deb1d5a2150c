//! Non-fatal problems recorded during an export.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tableau_client::ApiError;
use tableau_rbac::{ContentItem, ContentKind, PrincipalRef, ResolveWarning};

use crate::error::ExportResult;
use crate::report::StagedFile;

/// A problem that was skipped over. The run continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportWarning {
    /// An item disappeared between listing and fetching its permissions.
    DeletedContent {
        content_id: String,
        content_type: ContentKind,
        path: String,
    },

    /// The signed-in user may not read an item's permissions.
    AccessDenied {
        content_id: String,
        content_type: ContentKind,
        path: String,
        message: String,
    },

    /// Fetching an item's permissions failed after retries.
    RequestFailed {
        content_id: String,
        content_type: ContentKind,
        path: String,
        message: String,
    },

    /// An item whose parent project is not on the site.
    OrphanedItem {
        content_id: String,
        content_type: ContentKind,
        name: String,
        parent_project_id: Option<String>,
    },

    /// A requested root project does not exist.
    UnknownRoot { project_id: String },

    /// Listing a whole content kind failed; the kind is treated as empty.
    ListingFailed {
        content_type: ContentKind,
        message: String,
    },

    /// A permission rule referenced an unknown template.
    UnrecognizedTemplate {
        content_id: String,
        principal: PrincipalRef,
        template: String,
    },

    /// User or group names could not be looked up; ids are reported instead.
    DirectoryUnavailable { message: String },

    /// A group's members could not be fetched; it is reported without members.
    MembershipUnavailable { group_id: String, message: String },
}

impl ExportWarning {
    /// Warning for a failed per-item request.
    pub(crate) fn for_item(item: &ContentItem, path: &str, err: &ApiError) -> Self {
        match err {
            ApiError::NotFound(_) => ExportWarning::DeletedContent {
                content_id: item.id.clone(),
                content_type: item.kind,
                path: path.to_string(),
            },
            ApiError::Forbidden(message) => ExportWarning::AccessDenied {
                content_id: item.id.clone(),
                content_type: item.kind,
                path: path.to_string(),
                message: message.clone(),
            },
            other => ExportWarning::RequestFailed {
                content_id: item.id.clone(),
                content_type: item.kind,
                path: path.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<ResolveWarning> for ExportWarning {
    fn from(warning: ResolveWarning) -> Self {
        match warning {
            ResolveWarning::UnrecognizedTemplate {
                content_id,
                principal,
                template,
            } => ExportWarning::UnrecognizedTemplate {
                content_id,
                principal,
                template,
            },
        }
    }
}

impl std::fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportWarning::DeletedContent {
                content_type, path, ..
            } => write!(f, "{} '{}' was deleted during the export", content_type, path),
            ExportWarning::AccessDenied {
                content_type,
                path,
                message,
                ..
            } => write!(
                f,
                "permissions of {} '{}' are not readable: {}",
                content_type, path, message
            ),
            ExportWarning::RequestFailed {
                content_type,
                path,
                message,
                ..
            } => write!(f, "skipped {} '{}': {}", content_type, path, message),
            ExportWarning::OrphanedItem {
                content_type,
                name,
                parent_project_id,
                ..
            } => write!(
                f,
                "{} '{}' has no parent project on the site (parent: {})",
                content_type,
                name,
                parent_project_id.as_deref().unwrap_or("none")
            ),
            ExportWarning::UnknownRoot { project_id } => {
                write!(f, "root project {} does not exist", project_id)
            }
            ExportWarning::ListingFailed {
                content_type,
                message,
            } => write!(f, "could not list {}: {}", content_type.collection(), message),
            ExportWarning::UnrecognizedTemplate {
                content_id,
                principal,
                template,
            } => write!(
                f,
                "unrecognized template '{}' for {} on {}",
                template, principal, content_id
            ),
            ExportWarning::DirectoryUnavailable { message } => {
                write!(f, "principal names unavailable: {}", message)
            }
            ExportWarning::MembershipUnavailable { group_id, message } => {
                write!(f, "members of group {} unavailable: {}", group_id, message)
            }
        }
    }
}

/// Write warnings as a pretty-printed JSON array, atomically like the report.
pub fn write_warnings(path: &Path, warnings: &[ExportWarning]) -> ExportResult<()> {
    StagedFile::stage(path, |file| serde_json::to_writer_pretty(file, warnings))?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;

    #[test]
    fn test_for_item_classifies_errors() {
        let item = ContentItem::new("w1", "Q1 Report", ContentKind::Workbook);

        let deleted = ExportWarning::for_item(&item, "Sales/Q1 Report", &ApiError::NotFound("w1".into()));
        assert!(matches!(deleted, ExportWarning::DeletedContent { .. }));

        let denied = ExportWarning::for_item(&item, "Sales/Q1 Report", &ApiError::Forbidden("no".into()));
        assert!(matches!(denied, ExportWarning::AccessDenied { .. }));

        let failed = ExportWarning::for_item(
            &item,
            "Sales/Q1 Report",
            &ApiError::from_status(503, "unavailable".into()),
        );
        assert!(matches!(failed, ExportWarning::RequestFailed { .. }));
    }

    #[test]
    fn test_serialized_with_kind_tag() {
        let warning = ExportWarning::UnknownRoot {
            project_id: "p9".into(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "unknown_root");
        assert_eq!(json["project_id"], "p9");
    }

    #[test]
    fn test_write_warnings_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warnings.json");
        std::fs::write(&path, "[{\"kind\": \"stale\"}, {\"kind\": \"longer than the new file\"}]").unwrap();

        write_warnings(&path, &[]).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_warnings_failure_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("warnings.json");

        let err = write_warnings(&path, &[]).unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warnings.json");
        let warnings = vec![ExportWarning::MembershipUnavailable {
            group_id: "g1".into(),
            message: "timeout".into(),
        }];

        write_warnings(&path, &warnings).unwrap();

        let parsed: Vec<ExportWarning> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, warnings);
    }
}
