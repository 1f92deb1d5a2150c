//! # Capabilities
//!
//! Fine-grained permissions that can be allowed or denied on a content item.
//! Capability names follow the REST API spelling (`Read`, `ExportXml`, ...);
//! names the table does not know are carried through as [`Capability::Other`]
//! so new vendor capabilities still reach the report.

use serde::{Deserialize, Serialize};

use crate::kinds::ContentKind;

/// A single capability.
///
/// The declaration order is the column order of the permission dialog and is
/// used to sort report rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Capability {
    /// View the content.
    Read,
    /// Interact with filters.
    Filter,
    /// See comments.
    ViewComments,
    /// Add comments.
    AddComment,
    /// Download image or PDF.
    ExportImage,
    /// Download summary data.
    ExportData,
    /// Share customized views.
    ShareView,
    /// Download full data.
    ViewUnderlyingData,
    /// Web edit.
    WebAuthoring,
    /// Run Explain Data.
    RunExplainData,
    /// Download the workbook, data source or flow file.
    ExportXml,
    /// Overwrite (or publish, on projects).
    Write,
    /// Create/refresh metrics (older name of extract refresh).
    CreateRefreshMetrics,
    /// Move the content to another project.
    ChangeHierarchy,
    /// Delete the content.
    Delete,
    /// Set permissions.
    ChangePermissions,
    /// Run extract refreshes.
    ExtractRefresh,
    /// Connect to a data source.
    Connect,
    /// Save a data source under a new name.
    SaveAs,
    /// Query a data source through the VizQL Data Service.
    VizqlDataApiAccess,
    /// Create Pulse metric definitions.
    PulseMetricDefine,
    /// Run a flow.
    Execute,
    /// Web edit a flow.
    WebAuthoringForFlows,
    /// Project leader on a project.
    ProjectLeader,
    /// A capability not known to this table.
    Other(String),
}

impl Capability {
    /// Get the REST API name of the capability.
    pub fn as_str(&self) -> &str {
        match self {
            Capability::Read => "Read",
            Capability::Filter => "Filter",
            Capability::ViewComments => "ViewComments",
            Capability::AddComment => "AddComment",
            Capability::ExportImage => "ExportImage",
            Capability::ExportData => "ExportData",
            Capability::ShareView => "ShareView",
            Capability::ViewUnderlyingData => "ViewUnderlyingData",
            Capability::WebAuthoring => "WebAuthoring",
            Capability::RunExplainData => "RunExplainData",
            Capability::ExportXml => "ExportXml",
            Capability::Write => "Write",
            Capability::CreateRefreshMetrics => "CreateRefreshMetrics",
            Capability::ChangeHierarchy => "ChangeHierarchy",
            Capability::Delete => "Delete",
            Capability::ChangePermissions => "ChangePermissions",
            Capability::ExtractRefresh => "ExtractRefresh",
            Capability::Connect => "Connect",
            Capability::SaveAs => "SaveAs",
            Capability::VizqlDataApiAccess => "VizqlDataApiAccess",
            Capability::PulseMetricDefine => "PulseMetricDefine",
            Capability::Execute => "Execute",
            Capability::WebAuthoringForFlows => "WebAuthoringForFlows",
            Capability::ProjectLeader => "ProjectLeader",
            Capability::Other(name) => name,
        }
    }

    /// Parse a capability from its REST API name.
    ///
    /// Matching is case-insensitive; unknown names become [`Capability::Other`].
    ///
    /// # Example
    ///
    /// ```
    /// use tableau_rbac::Capability;
    ///
    /// assert_eq!(Capability::parse("exportxml"), Capability::ExportXml);
    /// assert_eq!(
    ///     Capability::parse("CreateMetric"),
    ///     Capability::Other("CreateMetric".to_string())
    /// );
    /// ```
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "read" => Capability::Read,
            "filter" => Capability::Filter,
            "viewcomments" => Capability::ViewComments,
            "addcomment" => Capability::AddComment,
            "exportimage" => Capability::ExportImage,
            "exportdata" => Capability::ExportData,
            "shareview" => Capability::ShareView,
            "viewunderlyingdata" => Capability::ViewUnderlyingData,
            "webauthoring" => Capability::WebAuthoring,
            "runexplaindata" => Capability::RunExplainData,
            "exportxml" => Capability::ExportXml,
            "write" => Capability::Write,
            "createrefreshmetrics" => Capability::CreateRefreshMetrics,
            "changehierarchy" => Capability::ChangeHierarchy,
            "delete" => Capability::Delete,
            "changepermissions" => Capability::ChangePermissions,
            "extractrefresh" => Capability::ExtractRefresh,
            "connect" => Capability::Connect,
            "saveas" => Capability::SaveAs,
            "vizqldataapiaccess" => Capability::VizqlDataApiAccess,
            "pulsemetricdefine" => Capability::PulseMetricDefine,
            "execute" => Capability::Execute,
            "webauthoringforflows" => Capability::WebAuthoringForFlows,
            "projectleader" => Capability::ProjectLeader,
            _ => Capability::Other(trimmed.to_string()),
        }
    }

    /// Label shown for this capability in the permission dialog.
    ///
    /// Some capabilities read differently depending on the content kind
    /// (`ExportXml` downloads a workbook, a data source or a flow; `Write` on
    /// a project means publishing into it).
    pub fn label(&self, kind: ContentKind) -> String {
        let label = match (self, kind) {
            (Capability::ExportXml, ContentKind::Workbook | ContentKind::View) => {
                "Download/Save a Copy"
            }
            (Capability::ExportXml, ContentKind::Datasource) => "Download Data Source",
            (Capability::ExportXml, ContentKind::Flow) => "Download Flow",
            (Capability::Write, ContentKind::Project) => "Publish",
            (Capability::Read, _) => "View",
            (Capability::Filter, _) => "Filter",
            (Capability::ViewComments, _) => "View Comments",
            (Capability::AddComment, _) => "Add Comments",
            (Capability::ExportImage, _) => "Download Image/PDF",
            (Capability::ExportData, _) => "Download Summary Data",
            (Capability::ShareView, _) => "Share Customized",
            (Capability::ViewUnderlyingData, _) => "Download Full Data",
            (Capability::WebAuthoring, _) | (Capability::WebAuthoringForFlows, _) => "Web Edit",
            (Capability::RunExplainData, _) => "Run Explain Data",
            (Capability::Write, _) => "Overwrite",
            (Capability::CreateRefreshMetrics, _) | (Capability::ExtractRefresh, _) => {
                "Extract Refresh"
            }
            (Capability::ChangeHierarchy, _) => "Move",
            (Capability::Delete, _) => "Delete",
            (Capability::ChangePermissions, _) => "Set Permissions",
            (Capability::Connect, _) => "Connect",
            (Capability::SaveAs, _) => "Save As",
            (Capability::VizqlDataApiAccess, _) => "API Access",
            (Capability::PulseMetricDefine, _) => "Create Metric Definitions",
            (Capability::Execute, _) => "Run Flow",
            (Capability::ProjectLeader, _) => "Project Leader",
            (Capability::ExportXml, ContentKind::Project) => "Download",
            (Capability::Other(name), _) => return name.clone(),
        };
        label.to_string()
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        Capability::parse(&s)
    }
}

impl From<Capability> for String {
    fn from(c: Capability) -> Self {
        c.as_str().to_string()
    }
}

/// Whether a capability is allowed or denied.
///
/// `Allow` sorts before `Deny`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// The capability is granted.
    Allow,
    /// The capability is explicitly denied.
    Deny,
}

impl Effect {
    /// Get the REST API spelling (`Allow` / `Deny`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }

    /// Parse a capability mode (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Some(Effect::Allow),
            "deny" => Some(Effect::Deny),
            _ => None,
        }
    }

    /// Combine two effects for the same capability: deny wins.
    pub fn combine(self, other: Effect) -> Effect {
        if self == Effect::Deny || other == Effect::Deny {
            Effect::Deny
        } else {
            Effect::Allow
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_parse_known() {
        assert_eq!(Capability::parse("Read"), Capability::Read);
        assert_eq!(Capability::parse("ViewUnderlyingData"), Capability::ViewUnderlyingData);
        assert_eq!(Capability::parse("webauthoringforflows"), Capability::WebAuthoringForFlows);
    }

    #[test]
    fn test_capability_parse_unknown_is_preserved() {
        let cap = Capability::parse("CreateMetric");
        assert_eq!(cap, Capability::Other("CreateMetric".to_string()));
        assert_eq!(cap.as_str(), "CreateMetric");
        assert_eq!(cap.label(ContentKind::Workbook), "CreateMetric");
    }

    #[test]
    fn test_capability_labels_depend_on_kind() {
        assert_eq!(Capability::ExportXml.label(ContentKind::Workbook), "Download/Save a Copy");
        assert_eq!(Capability::ExportXml.label(ContentKind::Datasource), "Download Data Source");
        assert_eq!(Capability::ExportXml.label(ContentKind::Flow), "Download Flow");
        assert_eq!(Capability::Write.label(ContentKind::Project), "Publish");
        assert_eq!(Capability::Write.label(ContentKind::Workbook), "Overwrite");
        assert_eq!(Capability::Read.label(ContentKind::View), "View");
    }

    #[test]
    fn test_capability_serde_uses_api_name() {
        let json = serde_json::to_string(&Capability::ExportXml).unwrap();
        assert_eq!(json, "\"ExportXml\"");
        let parsed: Capability = serde_json::from_str("\"SaveAs\"").unwrap();
        assert_eq!(parsed, Capability::SaveAs);
    }

    #[test]
    fn test_effect_parse_and_combine() {
        assert_eq!(Effect::parse("Allow"), Some(Effect::Allow));
        assert_eq!(Effect::parse("DENY"), Some(Effect::Deny));
        assert_eq!(Effect::parse("No API Endpoint"), None);

        assert_eq!(Effect::Allow.combine(Effect::Allow), Effect::Allow);
        assert_eq!(Effect::Allow.combine(Effect::Deny), Effect::Deny);
        assert_eq!(Effect::Deny.combine(Effect::Allow), Effect::Deny);
    }
}
