//! In-memory Tableau site for exporter tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tableau_client::{ApiError, ApiResult, ContentApi};
use tableau_export::CancelFlag;
use tableau_rbac::{ContentItem, ContentKind, PermissionRule, Principal, PrincipalRef};

/// Failure injected into a fake call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Forbidden,
    Auth,
    Unavailable,
}

impl Failure {
    fn to_error(self) -> ApiError {
        match self {
            Failure::NotFound => ApiError::NotFound("Resource Not Found (code 404004)".into()),
            Failure::Forbidden => ApiError::Forbidden("Forbidden (code 403004)".into()),
            Failure::Auth => ApiError::Auth("Signin Error (code 401002)".into()),
            Failure::Unavailable => ApiError::Transient {
                status: 503,
                message: "Service Unavailable".into(),
            },
        }
    }
}

/// A site held in memory, with call counters and failure injection.
#[derive(Default)]
pub struct FakeSite {
    items: Vec<ContentItem>,
    permissions: HashMap<String, Vec<PermissionRule>>,
    defaults: HashMap<(String, ContentKind), Vec<PermissionRule>>,
    users: Vec<Principal>,
    groups: Vec<Principal>,
    members: HashMap<String, Vec<Principal>>,
    permission_failures: HashMap<String, Failure>,
    member_failures: HashMap<String, Failure>,
    listing_failures: HashMap<ContentKind, Failure>,
    cancel_after: Option<(usize, CancelFlag)>,
    permission_calls: AtomicUsize,
    member_calls: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: ContentItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_permissions(mut self, content_id: &str, rules: Vec<PermissionRule>) -> Self {
        self.permissions.insert(content_id.to_string(), rules);
        self
    }

    pub fn with_defaults(
        mut self,
        project_id: &str,
        kind: ContentKind,
        rules: Vec<PermissionRule>,
    ) -> Self {
        self.defaults.insert((project_id.to_string(), kind), rules);
        self
    }

    pub fn with_user(mut self, user: Principal) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_group(mut self, group: Principal, members: Vec<Principal>) -> Self {
        self.members.insert(group.id.clone(), members);
        self.groups.push(group);
        self
    }

    pub fn fail_permissions(mut self, content_id: &str, failure: Failure) -> Self {
        self.permission_failures
            .insert(content_id.to_string(), failure);
        self
    }

    pub fn fail_members(mut self, group_id: &str, failure: Failure) -> Self {
        self.member_failures.insert(group_id.to_string(), failure);
        self
    }

    pub fn fail_listing(mut self, kind: ContentKind, failure: Failure) -> Self {
        self.listing_failures.insert(kind, failure);
        self
    }

    /// Raise `flag` during the `n`th permission request.
    pub fn cancel_after(mut self, n: usize, flag: CancelFlag) -> Self {
        self.cancel_after = Some((n, flag));
        self
    }

    pub fn permission_calls(&self) -> usize {
        self.permission_calls.load(Ordering::SeqCst)
    }

    pub fn member_calls(&self) -> Vec<String> {
        self.member_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentApi for FakeSite {
    async fn list_all(
        &self,
        kind: ContentKind,
        parent: Option<&str>,
    ) -> ApiResult<Vec<ContentItem>> {
        if let Some(failure) = self.listing_failures.get(&kind) {
            return Err(failure.to_error());
        }
        Ok(self
            .items
            .iter()
            .filter(|item| item.kind == kind)
            .filter(|item| parent.map_or(true, |p| item.parent_project_id.as_deref() == Some(p)))
            .cloned()
            .collect())
    }

    async fn get_permissions(&self, item: &ContentItem) -> ApiResult<Vec<PermissionRule>> {
        let call = self.permission_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((n, flag)) = &self.cancel_after {
            if call >= *n {
                flag.cancel();
            }
        }
        if let Some(failure) = self.permission_failures.get(&item.id) {
            return Err(failure.to_error());
        }
        Ok(self.permissions.get(&item.id).cloned().unwrap_or_default())
    }

    async fn get_default_permissions(
        &self,
        project_id: &str,
        kind: ContentKind,
    ) -> ApiResult<Vec<PermissionRule>> {
        Ok(self
            .defaults
            .get(&(project_id.to_string(), kind))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_users(&self) -> ApiResult<Vec<Principal>> {
        Ok(self.users.clone())
    }

    async fn list_groups(&self) -> ApiResult<Vec<Principal>> {
        Ok(self.groups.clone())
    }

    async fn list_group_members(&self, group_id: &str) -> ApiResult<Vec<Principal>> {
        self.member_calls.lock().unwrap().push(group_id.to_string());
        if let Some(failure) = self.member_failures.get(group_id) {
            return Err(failure.to_error());
        }
        Ok(self.members.get(group_id).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn project(id: &str, name: &str, parent: Option<&str>) -> ContentItem {
    let item = ContentItem::new(id, name, ContentKind::Project);
    match parent {
        Some(parent) => item.with_parent(parent),
        None => item,
    }
}

pub fn workbook(id: &str, name: &str, project_id: &str) -> ContentItem {
    ContentItem::new(id, name, ContentKind::Workbook).with_parent(project_id)
}

pub fn alice() -> Principal {
    Principal::user("u1", "alice").with_email("alice@example.com")
}

pub fn bob() -> Principal {
    Principal::user("u2", "bob")
}

pub fn analysts() -> Principal {
    Principal::group("g1", "Analysts")
}

/// `Sales` holding the `Q1 Report` workbook, granted `Viewer` to Analysts,
/// whose only member is alice.
pub fn sales_site() -> FakeSite {
    FakeSite::new()
        .with_item(project("p1", "Sales", None))
        .with_item(workbook("w1", "Q1 Report", "p1"))
        .with_permissions(
            "w1",
            vec![PermissionRule::template(
                "w1",
                ContentKind::Workbook,
                PrincipalRef::group("g1"),
                "Viewer",
            )],
        )
        .with_user(alice())
        .with_user(bob())
        .with_group(analysts(), vec![alice()])
}
