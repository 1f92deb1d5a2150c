//! # Content Tree Walker
//!
//! Produces every content item reachable from a set of root projects.
//!
//! The site is listed once per kind and the listing is grouped by parent
//! project, then walked depth first from the roots:
//!
//! ```text
//! Sales                  (project)
//! ├── Sales/Q1 Report    (workbook)
//! │   └── Sales/Q1 Report/Overview (view)
//! └── Sales/Regional     (nested project)
//!     └── ...
//! ```
//!
//! Within a project the project itself comes first, then its content sorted by
//! kind, name and ID, then its child projects sorted by name and ID. Every
//! item is emitted at most once, however often it is listed or reached.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tableau_client::ContentApi;
use tableau_rbac::{ContentItem, ContentKind, ContentPermissions};

use crate::error::ExportResult;
use crate::warnings::ExportWarning;

/// Which projects to start the walk from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootSelection {
    /// Every top-level project.
    All,
    /// The given project IDs.
    Projects(Vec<String>),
}

/// An item reached by the walk, with its breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedItem {
    /// The item.
    pub item: ContentItem,
    /// `/`-separated names from the top-level project down to the item.
    pub path: String,
    /// Permission mode of the project governing the item: its own for a
    /// project, the containing project's otherwise.
    pub asset_permissions: Option<ContentPermissions>,
}

/// One node of the project hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectNode {
    /// The project.
    pub item: ContentItem,
    /// Nested projects, sorted by name.
    pub children: Vec<ProjectNode>,
}

/// Result of a walk.
#[derive(Debug, Clone, Default)]
pub struct Walk {
    /// Reached items in walk order.
    pub items: Vec<WalkedItem>,
    /// Orphans, unknown roots and failed listings.
    pub warnings: Vec<ExportWarning>,
}

/// Site-wide listing the walk runs over.
#[derive(Debug, Clone, Default)]
pub struct SiteListing {
    /// Every project.
    pub projects: Vec<ContentItem>,
    /// Every item of the requested non-project kinds.
    pub content: Vec<ContentItem>,
    /// Workbook names by ID, for view breadcrumbs.
    pub workbook_names: HashMap<String, String>,
}

impl SiteListing {
    /// List projects and the requested kinds.
    ///
    /// An authentication failure ends the run. Any other failed listing is
    /// recorded as a warning and the kind is treated as empty.
    pub async fn fetch(
        api: &dyn ContentApi,
        kinds: &[ContentKind],
    ) -> ExportResult<(Self, Vec<ExportWarning>)> {
        let mut warnings = Vec::new();
        let projects = match api.list_all(ContentKind::Project, None).await {
            Ok(projects) => projects,
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Project listing failed, no projects to walk");
                warnings.push(ExportWarning::ListingFailed {
                    content_type: ContentKind::Project,
                    message: e.to_string(),
                });
                Vec::new()
            }
        };
        let mut content = Vec::new();
        let mut workbooks: Option<Vec<ContentItem>> = None;

        for &kind in &requested_content_kinds(kinds) {
            match api.list_all(kind, None).await {
                Ok(items) => {
                    debug!(kind = %kind, count = items.len(), "Listed content");
                    if kind == ContentKind::Workbook {
                        workbooks = Some(items.clone());
                    }
                    content.extend(items);
                }
                Err(e) if e.is_auth() => return Err(e.into()),
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Listing failed, skipping kind");
                    warnings.push(ExportWarning::ListingFailed {
                        content_type: kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        if kinds.contains(&ContentKind::View) && workbooks.is_none() {
            match api.list_all(ContentKind::Workbook, None).await {
                Ok(items) => workbooks = Some(items),
                Err(e) if e.is_auth() => return Err(e.into()),
                Err(e) => warn!(error = %e, "Workbook names unavailable for view paths"),
            }
        }

        let workbook_names = workbooks
            .unwrap_or_default()
            .into_iter()
            .map(|w| (w.id, w.name))
            .collect();

        Ok((
            Self {
                projects,
                content,
                workbook_names,
            },
            warnings,
        ))
    }
}

/// Walks the content tree of one site.
pub struct ContentWalker<'a> {
    api: &'a dyn ContentApi,
}

impl<'a> ContentWalker<'a> {
    /// Create a walker over a site.
    pub fn new(api: &'a dyn ContentApi) -> Self {
        Self { api }
    }

    /// Every item of `kinds` reachable from `roots`.
    ///
    /// Projects are always descended into, whether or not
    /// [`ContentKind::Project`] is among `kinds`.
    pub async fn walk(&self, roots: &RootSelection, kinds: &[ContentKind]) -> ExportResult<Walk> {
        let (listing, mut warnings) = SiteListing::fetch(self.api, kinds).await?;
        let mut walk = walk_listing(&listing, roots, kinds);

        for warning in &walk.warnings {
            warn!(%warning, "Walk warning");
        }
        warnings.append(&mut walk.warnings);
        walk.warnings = warnings;

        info!(items = walk.items.len(), "Content walk complete");
        Ok(walk)
    }

    /// The project hierarchy, top-level projects first.
    ///
    /// Projects whose parent is missing from the site are shown at the top
    /// level.
    pub async fn project_tree(&self) -> ExportResult<Vec<ProjectNode>> {
        let projects = self.api.list_all(ContentKind::Project, None).await?;
        Ok(build_project_tree(&projects))
    }
}

fn requested_content_kinds(kinds: &[ContentKind]) -> Vec<ContentKind> {
    let mut requested: Vec<ContentKind> = kinds
        .iter()
        .copied()
        .filter(|k| *k != ContentKind::Project)
        .collect();
    requested.sort();
    requested.dedup();
    requested
}

fn by_name(a: &&ContentItem, b: &&ContentItem) -> std::cmp::Ordering {
    (a.kind, &a.name, &a.id).cmp(&(b.kind, &b.name, &b.id))
}

/// Walk a listing. Pure; performs no I/O.
pub fn walk_listing(listing: &SiteListing, roots: &RootSelection, kinds: &[ContentKind]) -> Walk {
    let mut warnings = Vec::new();

    let mut projects: HashMap<&str, &ContentItem> = HashMap::new();
    let mut project_order: Vec<&ContentItem> = Vec::new();
    for project in &listing.projects {
        if !projects.contains_key(project.id.as_str()) {
            projects.insert(project.id.as_str(), project);
            project_order.push(project);
        }
    }

    let mut child_projects: HashMap<&str, Vec<&ContentItem>> = HashMap::new();
    let mut top_level: Vec<&ContentItem> = Vec::new();
    for project in project_order.iter().copied() {
        match project.parent_project_id.as_deref() {
            None => top_level.push(project),
            Some(parent) if projects.contains_key(parent) => {
                child_projects.entry(parent).or_default().push(project)
            }
            Some(parent) => warnings.push(ExportWarning::OrphanedItem {
                content_id: project.id.clone(),
                content_type: ContentKind::Project,
                name: project.name.clone(),
                parent_project_id: Some(parent.to_string()),
            }),
        }
    }

    let wanted = requested_content_kinds(kinds);
    let mut content: HashMap<&str, Vec<&ContentItem>> = HashMap::new();
    let mut listed: HashSet<(ContentKind, &str)> = HashSet::new();
    for item in &listing.content {
        if !wanted.contains(&item.kind) || !listed.insert((item.kind, item.id.as_str())) {
            continue;
        }
        match item.parent_project_id.as_deref() {
            Some(parent) if projects.contains_key(parent) => {
                content.entry(parent).or_default().push(item)
            }
            parent => warnings.push(ExportWarning::OrphanedItem {
                content_id: item.id.clone(),
                content_type: item.kind,
                name: item.name.clone(),
                parent_project_id: parent.map(str::to_string),
            }),
        }
    }

    top_level.sort_by(by_name);
    for children in child_projects.values_mut() {
        children.sort_by(by_name);
    }
    for items in content.values_mut() {
        items.sort_by(by_name);
    }

    let mut start: Vec<&ContentItem> = Vec::new();
    match roots {
        RootSelection::All => start = top_level,
        RootSelection::Projects(ids) => {
            for id in ids {
                match projects.get(id.as_str()) {
                    Some(project) => {
                        if !start.iter().any(|p| p.id == project.id) {
                            start.push(project);
                        }
                    }
                    None => warnings.push(ExportWarning::UnknownRoot {
                        project_id: id.clone(),
                    }),
                }
            }
        }
    }

    let mut paths = PathCache::new(&projects);
    let include_projects = kinds.contains(&ContentKind::Project);
    let mut seen: HashSet<(ContentKind, &str)> = HashSet::new();
    let mut items = Vec::new();

    // Reverse so the first root is popped first.
    let mut stack: Vec<&ContentItem> = start.into_iter().rev().collect();
    while let Some(project) = stack.pop() {
        if !seen.insert((ContentKind::Project, project.id.as_str())) {
            continue;
        }

        let project_path = paths.path_of(project);
        if include_projects {
            items.push(WalkedItem {
                item: project.clone(),
                path: project_path.clone(),
                asset_permissions: project.content_permissions,
            });
        }

        for item in content.get(project.id.as_str()).into_iter().flatten() {
            if !seen.insert((item.kind, item.id.as_str())) {
                continue;
            }
            let path = match (item.kind, item.workbook_id.as_ref()) {
                (ContentKind::View, Some(workbook_id)) => {
                    match listing.workbook_names.get(workbook_id) {
                        Some(workbook) => format!("{}/{}/{}", project_path, workbook, item.name),
                        None => format!("{}/{}", project_path, item.name),
                    }
                }
                _ => format!("{}/{}", project_path, item.name),
            };
            items.push(WalkedItem {
                item: (*item).clone(),
                path,
                asset_permissions: project.content_permissions,
            });
        }

        if let Some(children) = child_projects.get(project.id.as_str()) {
            stack.extend(children.iter().rev().copied());
        }
    }

    Walk { items, warnings }
}

/// Breadcrumbs of projects, memoised.
struct PathCache<'l> {
    projects: &'l HashMap<&'l str, &'l ContentItem>,
    paths: HashMap<&'l str, String>,
}

impl<'l> PathCache<'l> {
    fn new(projects: &'l HashMap<&'l str, &'l ContentItem>) -> Self {
        Self {
            projects,
            paths: HashMap::new(),
        }
    }

    fn path_of(&mut self, project: &'l ContentItem) -> String {
        if let Some(path) = self.paths.get(project.id.as_str()) {
            return path.clone();
        }

        let mut names = vec![project.name.as_str()];
        let mut visited: HashSet<&str> = HashSet::from([project.id.as_str()]);
        let mut current = project;
        while let Some(parent) = current
            .parent_project_id
            .as_deref()
            .and_then(|id| self.projects.get(id).copied())
        {
            // Parent cycles end the breadcrumb.
            if !visited.insert(parent.id.as_str()) {
                break;
            }
            names.push(parent.name.as_str());
            current = parent;
        }
        names.reverse();

        let path = names.join("/");
        self.paths.insert(project.id.as_str(), path.clone());
        path
    }
}

/// Arrange projects into a forest.
pub fn build_project_tree(projects: &[ContentItem]) -> Vec<ProjectNode> {
    let mut by_id: HashMap<&str, &ContentItem> = HashMap::new();
    for project in projects {
        by_id.entry(project.id.as_str()).or_insert(project);
    }

    let mut children: HashMap<&str, Vec<&ContentItem>> = HashMap::new();
    let mut roots: Vec<&ContentItem> = Vec::new();
    let mut placed: HashSet<&str> = HashSet::new();
    for project in projects {
        if !placed.insert(project.id.as_str()) {
            continue;
        }
        match project.parent_project_id.as_deref() {
            Some(parent) if by_id.contains_key(parent) && parent != project.id => {
                children.entry(parent).or_default().push(project)
            }
            _ => roots.push(project),
        }
    }

    roots.sort_by(by_name);
    let mut seen = HashSet::new();
    roots
        .into_iter()
        .filter_map(|root| build_node(root, &children, &mut seen))
        .collect()
}

fn build_node<'l>(
    project: &'l ContentItem,
    children: &HashMap<&str, Vec<&'l ContentItem>>,
    seen: &mut HashSet<&'l str>,
) -> Option<ProjectNode> {
    if !seen.insert(project.id.as_str()) {
        return None;
    }

    let mut nested: Vec<&ContentItem> = children
        .get(project.id.as_str())
        .cloned()
        .unwrap_or_default();
    nested.sort_by(by_name);

    Some(ProjectNode {
        item: project.clone(),
        children: nested
            .into_iter()
            .filter_map(|child| build_node(child, children, seen))
            .collect(),
    })
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    const CONTENT_KINDS: [ContentKind; 3] =
        [ContentKind::Workbook, ContentKind::Datasource, ContentKind::Flow];

    /// Random forest: project `i` may only hang under a project `j < i`.
    fn listing_strategy() -> impl Strategy<Value = (SiteListing, Vec<String>)> {
        (1usize..12)
            .prop_flat_map(|n| {
                (
                    Just(n),
                    prop::collection::vec(prop::option::of(0usize..12), n),
                    prop::collection::vec((0usize..12, 0usize..3), 0..30),
                    prop::collection::vec(0usize..40, 0..10),
                    prop::collection::vec(0usize..12, 1..5),
                )
            })
            .prop_map(|(n, parents, contents, duplicates, roots)| {
                let mut projects: Vec<ContentItem> = parents
                    .iter()
                    .enumerate()
                    .map(|(i, parent)| {
                        let item = ContentItem::new(format!("p{}", i), format!("P{}", i % 3), ContentKind::Project);
                        match parent {
                            Some(p) if *p < i => item.with_parent(format!("p{}", p)),
                            _ => item,
                        }
                    })
                    .collect();
                let mut content: Vec<ContentItem> = contents
                    .iter()
                    .enumerate()
                    .map(|(j, (parent, kind))| {
                        ContentItem::new(format!("c{}", j), format!("C{}", j % 4), CONTENT_KINDS[*kind])
                            .with_parent(format!("p{}", parent % n))
                    })
                    .collect();

                // The same item listed twice, as a shifting page might.
                for d in duplicates {
                    if d < projects.len() {
                        projects.push(projects[d].clone());
                    } else if !content.is_empty() {
                        content.push(content[d % content.len()].clone());
                    }
                }

                let roots = roots.into_iter().map(|r| format!("p{}", r % n)).collect();
                (
                    SiteListing {
                        projects,
                        content,
                        workbook_names: HashMap::new(),
                    },
                    roots,
                )
            })
    }

    fn reachable(listing: &SiteListing, roots: &[String], project_id: &str) -> bool {
        let parents: HashMap<&str, Option<&str>> = listing
            .projects
            .iter()
            .map(|p| (p.id.as_str(), p.parent_project_id.as_deref()))
            .collect();
        let mut current = Some(project_id);
        while let Some(id) = current {
            if roots.iter().any(|r| r == id) {
                return true;
            }
            current = parents.get(id).copied().flatten();
        }
        false
    }

    proptest! {
        #[test]
        fn test_every_reachable_item_exactly_once((listing, roots) in listing_strategy()) {
            let kinds = [
                ContentKind::Project,
                ContentKind::Workbook,
                ContentKind::Datasource,
                ContentKind::Flow,
            ];
            let walk = walk_listing(&listing, &RootSelection::Projects(roots.clone()), &kinds);

            let mut emitted = HashSet::new();
            for walked in &walk.items {
                prop_assert!(
                    emitted.insert((walked.item.kind, walked.item.id.clone())),
                    "emitted twice: {}", walked.item.id
                );
            }

            let mut expected = HashSet::new();
            for project in &listing.projects {
                if reachable(&listing, &roots, &project.id) {
                    expected.insert((ContentKind::Project, project.id.clone()));
                }
            }
            for item in &listing.content {
                let parent = item.parent_project_id.as_deref().unwrap_or_default();
                if reachable(&listing, &roots, parent) {
                    expected.insert((item.kind, item.id.clone()));
                }
            }

            prop_assert_eq!(emitted, expected);
        }
    }
}
