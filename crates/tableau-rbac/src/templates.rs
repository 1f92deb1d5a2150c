//! # Permission Templates
//!
//! Templates are named capability bundles ("View", "Explore", "Publish",
//! "Administer", project-leader variants, "Denied"). The same template name
//! implies a different capability set per content kind, so expansion is a
//! lookup on `(template, kind)` in a static table.
//!
//! ```text
//!               View        Explore               Publish                Administer
//! project       Read        Read                  Read Write             Read Write ProjectLeader
//! workbook      Read..ExpD  +Share +Full +WebEdit +Write +Move           everything
//!                           +ExplainData +Xml     +ExtractRefresh
//! view          Read..ExpD  +Share +Full +WebEdit (same as Explore)      everything
//! datasource    Read Conn   +Xml                  +Write +SaveAs +Refr   everything
//! flow          Read Xml    +WebEditFlows         +Execute +Write +Move  everything
//! ```

use serde::{Deserialize, Serialize};

use crate::capabilities::{Capability, Effect};
use crate::kinds::ContentKind;

/// A known permission template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// View template (site role "Viewer").
    View,
    /// Explore template (site role "Explorer").
    Explore,
    /// Publish template (site role "Publisher").
    Publish,
    /// Administer template (site role "Administrator").
    Administer,
    /// Project leader set directly on a project.
    ProjectLeader,
    /// Project leader inherited from a parent project.
    InheritedProjectLeader,
    /// Every capability of the kind, denied.
    Denied,
}

impl Template {
    /// Get the canonical name of the template.
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::View => "View",
            Template::Explore => "Explore",
            Template::Publish => "Publish",
            Template::Administer => "Administer",
            Template::ProjectLeader => "ProjectLeader",
            Template::InheritedProjectLeader => "InheritedProjectLeader",
            Template::Denied => "Denied",
        }
    }

    /// Parse a template name.
    ///
    /// Case, spaces, dashes and underscores are ignored, and the site-role
    /// spellings (`Viewer`, `Explorer`, `Publisher`, `Administrator`) are
    /// accepted as aliases.
    ///
    /// # Example
    ///
    /// ```
    /// use tableau_rbac::Template;
    ///
    /// assert_eq!(Template::parse("Viewer"), Some(Template::View));
    /// assert_eq!(Template::parse("project leader"), Some(Template::ProjectLeader));
    /// assert_eq!(Template::parse("FutureRole"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(|c| c.to_lowercase())
            .collect();
        match key.as_str() {
            "view" | "viewer" => Some(Template::View),
            "explore" | "explorer" => Some(Template::Explore),
            "publish" | "publisher" => Some(Template::Publish),
            "administer" | "administrator" | "admin" => Some(Template::Administer),
            "projectleader" => Some(Template::ProjectLeader),
            "inheritedprojectleader" => Some(Template::InheritedProjectLeader),
            "denied" | "deny" => Some(Template::Denied),
            _ => None,
        }
    }

    /// Whether the template makes its grantee a project leader.
    ///
    /// On a project these templates also cover every default-permission tab.
    pub fn is_project_leader(&self) -> bool {
        matches!(
            self,
            Template::Administer | Template::ProjectLeader | Template::InheritedProjectLeader
        )
    }

    /// All known templates.
    pub fn all() -> &'static [Template] {
        &[
            Template::View,
            Template::Explore,
            Template::Publish,
            Template::Administer,
            Template::ProjectLeader,
            Template::InheritedProjectLeader,
            Template::Denied,
        ]
    }

    /// Expand the template into concrete capability grants for a kind.
    ///
    /// This is a pure lookup: the same `(template, kind)` always yields the
    /// same list, in permission-dialog order.
    ///
    /// # Example
    ///
    /// ```
    /// use tableau_rbac::{Capability, ContentKind, Effect, Template};
    ///
    /// let caps = Template::View.expand(ContentKind::Datasource);
    /// assert_eq!(
    ///     caps,
    ///     vec![(Capability::Read, Effect::Allow), (Capability::Connect, Effect::Allow)]
    /// );
    /// ```
    pub fn expand(&self, kind: ContentKind) -> Vec<(Capability, Effect)> {
        let (capabilities, effect) = match self {
            Template::View => (view_capabilities(kind), Effect::Allow),
            Template::Explore => (explore_capabilities(kind), Effect::Allow),
            Template::Publish => (publish_capabilities(kind), Effect::Allow),
            Template::Administer | Template::ProjectLeader => {
                (administer_capabilities(kind), Effect::Allow)
            }
            Template::InheritedProjectLeader => match kind {
                // An inherited leader can publish into the project but does not
                // lead it.
                ContentKind::Project => (&PROJECT_PUBLISH[..], Effect::Allow),
                _ => (administer_capabilities(kind), Effect::Allow),
            },
            Template::Denied => (administer_capabilities(kind), Effect::Deny),
        };
        capabilities.iter().map(|c| (c.clone(), effect)).collect()
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static PROJECT_VIEW: [Capability; 1] = [Capability::Read];
static PROJECT_PUBLISH: [Capability; 2] = [Capability::Read, Capability::Write];
static PROJECT_ADMINISTER: [Capability; 3] =
    [Capability::Read, Capability::Write, Capability::ProjectLeader];

static WORKBOOK_VIEW: [Capability; 6] = [
    Capability::Read,
    Capability::Filter,
    Capability::ViewComments,
    Capability::AddComment,
    Capability::ExportImage,
    Capability::ExportData,
];
static WORKBOOK_EXPLORE: [Capability; 11] = [
    Capability::Read,
    Capability::Filter,
    Capability::ViewComments,
    Capability::AddComment,
    Capability::ExportImage,
    Capability::ExportData,
    Capability::ShareView,
    Capability::ViewUnderlyingData,
    Capability::WebAuthoring,
    Capability::RunExplainData,
    Capability::ExportXml,
];
static WORKBOOK_PUBLISH: [Capability; 14] = [
    Capability::Read,
    Capability::Filter,
    Capability::ViewComments,
    Capability::AddComment,
    Capability::ExportImage,
    Capability::ExportData,
    Capability::ShareView,
    Capability::ViewUnderlyingData,
    Capability::WebAuthoring,
    Capability::RunExplainData,
    Capability::ExportXml,
    Capability::Write,
    Capability::ChangeHierarchy,
    Capability::ExtractRefresh,
];
static WORKBOOK_ADMINISTER: [Capability; 16] = [
    Capability::Read,
    Capability::Filter,
    Capability::ViewComments,
    Capability::AddComment,
    Capability::ExportImage,
    Capability::ExportData,
    Capability::ShareView,
    Capability::ViewUnderlyingData,
    Capability::WebAuthoring,
    Capability::RunExplainData,
    Capability::ExportXml,
    Capability::Write,
    Capability::ChangeHierarchy,
    Capability::Delete,
    Capability::ChangePermissions,
    Capability::ExtractRefresh,
];

static VIEW_EXPLORE: [Capability; 9] = [
    Capability::Read,
    Capability::Filter,
    Capability::ViewComments,
    Capability::AddComment,
    Capability::ExportImage,
    Capability::ExportData,
    Capability::ShareView,
    Capability::ViewUnderlyingData,
    Capability::WebAuthoring,
];
static VIEW_ADMINISTER: [Capability; 11] = [
    Capability::Read,
    Capability::Filter,
    Capability::ViewComments,
    Capability::AddComment,
    Capability::ExportImage,
    Capability::ExportData,
    Capability::ShareView,
    Capability::ViewUnderlyingData,
    Capability::WebAuthoring,
    Capability::Delete,
    Capability::ChangePermissions,
];

static DATASOURCE_VIEW: [Capability; 2] = [Capability::Read, Capability::Connect];
static DATASOURCE_EXPLORE: [Capability; 3] =
    [Capability::Read, Capability::Connect, Capability::ExportXml];
static DATASOURCE_PUBLISH: [Capability; 6] = [
    Capability::Read,
    Capability::Connect,
    Capability::ExportXml,
    Capability::Write,
    Capability::SaveAs,
    Capability::ExtractRefresh,
];
static DATASOURCE_ADMINISTER: [Capability; 11] = [
    Capability::Read,
    Capability::Connect,
    Capability::ExportXml,
    Capability::Write,
    Capability::SaveAs,
    Capability::VizqlDataApiAccess,
    Capability::PulseMetricDefine,
    Capability::ChangeHierarchy,
    Capability::Delete,
    Capability::ChangePermissions,
    Capability::ExtractRefresh,
];

static FLOW_VIEW: [Capability; 2] = [Capability::Read, Capability::ExportXml];
static FLOW_EXPLORE: [Capability; 3] = [
    Capability::Read,
    Capability::ExportXml,
    Capability::WebAuthoringForFlows,
];
static FLOW_PUBLISH: [Capability; 6] = [
    Capability::Read,
    Capability::ExportXml,
    Capability::Execute,
    Capability::Write,
    Capability::WebAuthoringForFlows,
    Capability::ChangeHierarchy,
];
static FLOW_ADMINISTER: [Capability; 8] = [
    Capability::Read,
    Capability::ExportXml,
    Capability::Execute,
    Capability::Write,
    Capability::WebAuthoringForFlows,
    Capability::ChangeHierarchy,
    Capability::Delete,
    Capability::ChangePermissions,
];

fn view_capabilities(kind: ContentKind) -> &'static [Capability] {
    match kind {
        ContentKind::Project => &PROJECT_VIEW,
        ContentKind::Workbook => &WORKBOOK_VIEW,
        ContentKind::View => &WORKBOOK_VIEW,
        ContentKind::Datasource => &DATASOURCE_VIEW,
        ContentKind::Flow => &FLOW_VIEW,
    }
}

fn explore_capabilities(kind: ContentKind) -> &'static [Capability] {
    match kind {
        // Projects have no explore tier.
        ContentKind::Project => &PROJECT_VIEW,
        ContentKind::Workbook => &WORKBOOK_EXPLORE,
        ContentKind::View => &VIEW_EXPLORE,
        ContentKind::Datasource => &DATASOURCE_EXPLORE,
        ContentKind::Flow => &FLOW_EXPLORE,
    }
}

fn publish_capabilities(kind: ContentKind) -> &'static [Capability] {
    match kind {
        ContentKind::Project => &PROJECT_PUBLISH,
        ContentKind::Workbook => &WORKBOOK_PUBLISH,
        // Views cannot be published on their own.
        ContentKind::View => &VIEW_EXPLORE,
        ContentKind::Datasource => &DATASOURCE_PUBLISH,
        ContentKind::Flow => &FLOW_PUBLISH,
    }
}

fn administer_capabilities(kind: ContentKind) -> &'static [Capability] {
    match kind {
        ContentKind::Project => &PROJECT_ADMINISTER,
        ContentKind::Workbook => &WORKBOOK_ADMINISTER,
        ContentKind::View => &VIEW_ADMINISTER,
        ContentKind::Datasource => &DATASOURCE_ADMINISTER,
        ContentKind::Flow => &FLOW_ADMINISTER,
    }
}
