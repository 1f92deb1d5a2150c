//! # Principals and Group Membership
//!
//! Looks up display names for users and groups, and fetches the members of
//! every group that holds at least one grant.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use tableau_client::ContentApi;
use tableau_rbac::{CapabilityGrant, Principal, PrincipalRef};

use crate::error::{ExportError, ExportResult};
use crate::progress::CancelFlag;
use crate::warnings::ExportWarning;

/// Display names of the site's users and groups.
#[derive(Debug, Clone, Default)]
pub struct PrincipalDirectory {
    principals: HashMap<PrincipalRef, Principal>,
}

impl PrincipalDirectory {
    /// Build a directory from known principals.
    pub fn new(principals: impl IntoIterator<Item = Principal>) -> Self {
        Self {
            principals: principals.into_iter().map(|p| (p.to_ref(), p)).collect(),
        }
    }

    /// List the site's users and groups.
    ///
    /// A failed lookup leaves the directory partial and adds a warning;
    /// principals without a name are reported by ID.
    pub async fn fetch(api: &dyn ContentApi) -> ExportResult<(Self, Vec<ExportWarning>)> {
        let mut principals = Vec::new();
        let mut warnings = Vec::new();

        for result in [api.list_users().await, api.list_groups().await] {
            match result {
                Ok(found) => principals.extend(found),
                Err(e) if e.is_auth() => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "Principal lookup failed");
                    warnings.push(ExportWarning::DirectoryUnavailable {
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok((Self::new(principals), warnings))
    }

    /// Look up a principal.
    pub fn get(&self, principal: &PrincipalRef) -> Option<&Principal> {
        self.principals.get(principal)
    }

    /// Display name of a principal, or its ID when unknown.
    pub fn name_of(&self, principal: &PrincipalRef) -> String {
        self.get(principal)
            .map(|p| p.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| principal.id.clone())
    }
}

/// Members of the groups referenced by an export, keyed by group ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memberships {
    groups: BTreeMap<String, Vec<Principal>>,
}

impl Memberships {
    /// Members of a group, sorted by name. `None` when never fetched.
    pub fn members(&self, group_id: &str) -> Option<&[Principal]> {
        self.groups.get(group_id).map(Vec::as_slice)
    }

    /// Groups and their members, by group ID.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Principal])> {
        self.groups.iter().map(|(id, members)| (id.as_str(), members.as_slice()))
    }

    /// Number of groups fetched.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group was fetched.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Record a group's members.
    pub fn insert(&mut self, group_id: impl Into<String>, mut members: Vec<Principal>) {
        members.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
        members.dedup_by(|a, b| a.id == b.id);
        self.groups.insert(group_id.into(), members);
    }
}

/// Group IDs referenced by at least one grant, deduplicated and sorted.
pub fn referenced_groups(grants: &[CapabilityGrant]) -> Vec<String> {
    grants
        .iter()
        .filter(|g| g.principal.is_group())
        .map(|g| g.principal.id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fetches group members with bounded concurrency.
pub struct MembershipFetcher<'a> {
    api: &'a dyn ContentApi,
    concurrency: usize,
}

impl<'a> MembershipFetcher<'a> {
    /// Create a fetcher running at most `concurrency` requests at once.
    pub fn new(api: &'a dyn ContentApi, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch each group at most once.
    ///
    /// A group that cannot be fetched is recorded with no members and a
    /// warning. An authentication failure stops the fetch. Groups not yet
    /// started when `cancel` is raised are skipped.
    pub async fn fetch(
        &self,
        group_ids: &[String],
        cancel: &CancelFlag,
    ) -> ExportResult<(Memberships, Vec<ExportWarning>)> {
        let unique: BTreeSet<&str> = group_ids.iter().map(String::as_str).collect();
        debug!(groups = unique.len(), "Fetching group members");

        let mut results = stream::iter(unique)
            .map(move |group_id| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some((group_id, self.api.list_group_members(group_id).await))
            })
            .buffered(self.concurrency);

        let mut memberships = Memberships::default();
        let mut warnings = Vec::new();

        while let Some(result) = results.next().await {
            let Some((group_id, result)) = result else {
                continue;
            };
            match result {
                Ok(members) => memberships.insert(group_id, members),
                Err(e) if e.is_auth() => return Err(ExportError::from(e)),
                Err(e) => {
                    warn!(group_id, error = %e, "Group members unavailable");
                    warnings.push(ExportWarning::MembershipUnavailable {
                        group_id: group_id.to_string(),
                        message: e.to_string(),
                    });
                    memberships.insert(group_id, Vec::new());
                }
            }
        }

        Ok((memberships, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableau_rbac::{Capability, ContentKind, Effect};

    fn grant(principal: PrincipalRef) -> CapabilityGrant {
        CapabilityGrant {
            content_id: "w1".into(),
            applies_to: ContentKind::Workbook,
            principal,
            capability: Capability::Read,
            effect: Effect::Allow,
        }
    }

    #[test]
    fn test_referenced_groups_dedup() {
        let grants = vec![
            grant(PrincipalRef::group("g2")),
            grant(PrincipalRef::user("u1")),
            grant(PrincipalRef::group("g1")),
            grant(PrincipalRef::group("g2")),
        ];
        assert_eq!(referenced_groups(&grants), vec!["g1", "g2"]);
    }

    #[test]
    fn test_directory_falls_back_to_id() {
        let directory = PrincipalDirectory::new(vec![
            Principal::group("g1", "Analysts"),
            Principal::user("u1", "alice"),
        ]);
        assert_eq!(directory.name_of(&PrincipalRef::group("g1")), "Analysts");
        assert_eq!(directory.name_of(&PrincipalRef::user("u1")), "alice");
        assert_eq!(directory.name_of(&PrincipalRef::user("u2")), "u2");
        // Same ID, different kind.
        assert_eq!(directory.name_of(&PrincipalRef::group("u1")), "u1");
    }

    #[test]
    fn test_memberships_sorted_and_deduplicated() {
        let mut memberships = Memberships::default();
        memberships.insert(
            "g1",
            vec![
                Principal::user("u2", "bob"),
                Principal::user("u1", "alice"),
                Principal::user("u1", "alice"),
            ],
        );

        let names: Vec<&str> = memberships
            .members("g1")
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert!(memberships.members("g2").is_none());
    }
}
