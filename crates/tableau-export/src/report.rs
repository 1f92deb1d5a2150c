//! # Report Writer
//!
//! Flattens resolved grants into CSV rows and writes them atomically.
//! The report and the group-member file are staged first and moved into
//! place together: if either cannot be placed, neither changes on disk.
//!
//! ## Columns
//!
//! | Column | Content |
//! |--------|---------|
//! | `content_path` | Breadcrumb, e.g. `Sales/Q1 Report` |
//! | `content_type` | Kind of the item |
//! | `content_id` | Item ID |
//! | `asset_permissions` | Permission mode of the governing project |
//! | `applies_to` | Kind the grant governs (differs for project defaults) |
//! | `principal_kind` | `user` or `group` |
//! | `principal_name` | User or group name |
//! | `principal_id` | User or group ID |
//! | `capability` | REST API capability name |
//! | `capability_label` | Label shown in the permission dialog |
//! | `effect` | `Allow` or `Deny` |
//! | `member_name` | Group member, when membership is expanded |
//!
//! Rows are sorted, so the same input always produces the same bytes.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, TempPath};
use tracing::{info, warn};

use tableau_rbac::{CapabilityGrant, Principal};

use crate::error::{ExportError, ExportResult};
use crate::membership::{Memberships, PrincipalDirectory};
use crate::walker::WalkedItem;

/// One line of the permission report.
///
/// Field order is column order and sort order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportRow {
    /// Breadcrumb from the top-level project.
    pub content_path: String,
    /// Kind of the item.
    pub content_type: String,
    /// Item ID.
    pub content_id: String,
    /// `LockedToProject`, `LockedToProjectWithoutNested`, `ManagedByOwner`,
    /// or empty when the site did not report it.
    pub asset_permissions: String,
    /// Kind the grant governs.
    pub applies_to: String,
    /// `user` or `group`; empty on placeholder rows.
    pub principal_kind: String,
    /// Resolved name, or the ID when the principal is unknown.
    pub principal_name: String,
    /// User or group ID.
    pub principal_id: String,
    /// REST API capability name.
    pub capability: String,
    /// Permission dialog label.
    pub capability_label: String,
    /// `Allow` or `Deny`.
    pub effect: String,
    /// Group member the row was expanded for.
    pub member_name: String,
}

impl ReportRow {
    /// Row for one grant on one item.
    pub fn from_grant(
        item: &WalkedItem,
        grant: &CapabilityGrant,
        directory: &PrincipalDirectory,
    ) -> Self {
        Self {
            content_path: item.path.clone(),
            content_type: item.item.kind.as_str().to_string(),
            content_id: item.item.id.clone(),
            asset_permissions: asset_permissions(item),
            applies_to: grant.applies_to.as_str().to_string(),
            principal_kind: grant.principal.kind.as_str().to_string(),
            principal_name: directory.name_of(&grant.principal),
            principal_id: grant.principal.id.clone(),
            capability: grant.capability.as_str().to_string(),
            capability_label: grant.capability.label(grant.applies_to),
            effect: grant.effect.as_str().to_string(),
            member_name: String::new(),
        }
    }

    /// Placeholder for an item with no grants.
    pub fn unassigned(item: &WalkedItem) -> Self {
        Self {
            content_path: item.path.clone(),
            content_type: item.item.kind.as_str().to_string(),
            content_id: item.item.id.clone(),
            asset_permissions: asset_permissions(item),
            applies_to: item.item.kind.as_str().to_string(),
            ..Self::default()
        }
    }

    /// Whether this is an [`unassigned`](Self::unassigned) placeholder.
    pub fn is_unassigned(&self) -> bool {
        self.capability.is_empty()
    }

    fn with_member(&self, member: &str) -> Self {
        Self {
            member_name: member.to_string(),
            ..self.clone()
        }
    }
}

fn asset_permissions(item: &WalkedItem) -> String {
    item.asset_permissions
        .map(|mode| mode.as_str().to_string())
        .unwrap_or_default()
}

/// An item together with the grants resolved for it.
#[derive(Debug, Clone)]
pub struct ItemGrants<'a> {
    /// The item.
    pub item: &'a WalkedItem,
    /// Its grants; empty when nothing applies.
    pub grants: &'a [CapabilityGrant],
}

/// Flatten grants into sorted rows.
///
/// With `memberships`, every group grant becomes one row per member; a group
/// without members keeps a single row with an empty member. With
/// `include_unassigned`, items without grants get a placeholder row.
pub fn build_rows(
    items: &[ItemGrants<'_>],
    directory: &PrincipalDirectory,
    memberships: Option<&Memberships>,
    include_unassigned: bool,
) -> Vec<ReportRow> {
    let mut rows = Vec::new();

    for entry in items {
        if entry.grants.is_empty() {
            if include_unassigned {
                rows.push(ReportRow::unassigned(entry.item));
            }
            continue;
        }

        for grant in entry.grants {
            let row = ReportRow::from_grant(entry.item, grant, directory);
            let members = memberships
                .filter(|_| grant.principal.is_group())
                .and_then(|m| m.members(&grant.principal.id))
                .filter(|members| !members.is_empty());

            match members {
                Some(members) => rows.extend(members.iter().map(|m| row.with_member(&m.name))),
                None => rows.push(row),
            }
        }
    }

    rows.sort();
    rows.dedup();
    rows
}

/// Serialize rows as CSV with a header line.
pub fn write_rows<W: Write>(writer: W, rows: &[ReportRow]) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        // Serialize writes the header with the first record only.
        csv.write_record(COLUMNS)?;
    }
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Parse rows written by [`write_rows`].
pub fn read_rows<R: Read>(reader: R) -> csv::Result<Vec<ReportRow>> {
    csv::Reader::from_reader(reader).deserialize().collect()
}

/// Report column names, in order.
pub const COLUMNS: [&str; 12] = [
    "content_path",
    "content_type",
    "content_id",
    "asset_permissions",
    "applies_to",
    "principal_kind",
    "principal_name",
    "principal_id",
    "capability",
    "capability_label",
    "effect",
    "member_name",
];

/// Write a report atomically.
///
/// Rows go to a temporary file next to `path`, which then replaces `path`.
/// On failure the temporary file is removed and `path` is untouched.
pub fn write_report(path: &Path, rows: &[ReportRow]) -> ExportResult<()> {
    stage_report(path, rows)?.commit()
}

pub(crate) fn stage_report(path: &Path, rows: &[ReportRow]) -> ExportResult<StagedFile> {
    StagedFile::stage(path, |file| write_rows(file, rows))
}

/// Read a report written by [`write_report`].
pub fn read_report(path: &Path) -> ExportResult<Vec<ReportRow>> {
    let file = File::open(path).map_err(|e| ExportError::read(path, e))?;
    read_rows(file).map_err(|e| ExportError::read(path, e))
}

/// One line of the group-member file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupMemberRow {
    /// Group ID.
    pub group_id: String,
    /// Group name, or the ID when unknown.
    pub group_name: String,
    /// Member user ID; empty for a group without members.
    pub user_id: String,
    /// Member sign-in name.
    pub user_name: String,
    /// Member email, when the site has one.
    pub user_email: String,
}

/// Flatten memberships into sorted rows. Groups without members get one row
/// with empty user columns.
pub fn group_member_rows(
    memberships: &Memberships,
    directory: &PrincipalDirectory,
) -> Vec<GroupMemberRow> {
    let mut rows = Vec::new();
    for (group_id, members) in memberships.iter() {
        let group_name = directory.name_of(&tableau_rbac::PrincipalRef::group(group_id));
        let row = |member: Option<&Principal>| GroupMemberRow {
            group_id: group_id.to_string(),
            group_name: group_name.clone(),
            user_id: member.map(|m| m.id.clone()).unwrap_or_default(),
            user_name: member.map(|m| m.name.clone()).unwrap_or_default(),
            user_email: member.and_then(|m| m.email.clone()).unwrap_or_default(),
        };
        if members.is_empty() {
            rows.push(row(None));
        } else {
            rows.extend(members.iter().map(|m| row(Some(m))));
        }
    }
    rows.sort();
    rows
}

/// Write the group-member file atomically.
pub fn write_group_members(path: &Path, rows: &[GroupMemberRow]) -> ExportResult<()> {
    stage_group_members(path, rows)?.commit()
}

pub(crate) fn stage_group_members(
    path: &Path,
    rows: &[GroupMemberRow],
) -> ExportResult<StagedFile> {
    StagedFile::stage(path, |file| {
        let mut csv = csv::Writer::from_writer(file);
        if rows.is_empty() {
            csv.write_record(["group_id", "group_name", "user_id", "user_name", "user_email"])?;
        }
        for row in rows {
            csv.serialize(row)?;
        }
        csv.flush()?;
        Ok::<_, csv::Error>(())
    })
}

/// Path of the group-member file for a report: `<stem>_group_members.csv`
/// in the same directory.
pub fn group_members_path(report: &Path) -> PathBuf {
    let stem = report
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "permissions".to_string());
    report.with_file_name(format!("{}_group_members.csv", stem))
}

/// An output file written next to its destination, not yet in place.
///
/// Dropping it without committing removes the temporary file.
#[derive(Debug)]
pub(crate) struct StagedFile {
    temp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    /// Write and sync a temporary file in the directory of `path`.
    pub(crate) fn stage<F, E>(path: &Path, write: F) -> ExportResult<Self>
    where
        F: FnOnce(&mut File) -> Result<(), E>,
        E: std::fmt::Display,
    {
        let mut temp =
            NamedTempFile::new_in(parent_dir(path)).map_err(|e| ExportError::write(path, e))?;
        write(temp.as_file_mut()).map_err(|e| ExportError::write(path, e))?;
        temp.as_file_mut()
            .sync_all()
            .map_err(|e| ExportError::write(path, e))?;
        Ok(Self {
            temp,
            path: path.to_path_buf(),
        })
    }

    /// Move the file into place.
    pub(crate) fn commit(self) -> ExportResult<()> {
        commit_all(vec![self])
    }
}

/// What a destination held before it was replaced.
enum Previous {
    Missing,
    Saved(TempPath),
}

/// Move staged files into place, all or nothing.
///
/// When one cannot be placed, the ones already placed get their previous
/// content back, or are removed if they did not exist before.
pub(crate) fn commit_all(files: Vec<StagedFile>) -> ExportResult<()> {
    let mut placed: Vec<(PathBuf, Previous)> = Vec::with_capacity(files.len());

    for StagedFile { temp, path } in files {
        let outcome = save_previous(&path).and_then(|previous| {
            temp.persist(&path)
                .map_err(|e| ExportError::write(&path, e.error))?;
            Ok(previous)
        });
        match outcome {
            Ok(previous) => placed.push((path, previous)),
            Err(err) => {
                roll_back(placed);
                return Err(err);
            }
        }
    }

    for (path, _) in &placed {
        info!(path = %path.display(), "Wrote output file");
    }
    Ok(())
}

fn save_previous(path: &Path) -> ExportResult<Previous> {
    if !path.is_file() {
        return Ok(Previous::Missing);
    }
    let saved = NamedTempFile::new_in(parent_dir(path))
        .map_err(|e| ExportError::write(path, e))?
        .into_temp_path();
    std::fs::copy(path, &saved).map_err(|e| ExportError::write(path, e))?;
    Ok(Previous::Saved(saved))
}

fn roll_back(placed: Vec<(PathBuf, Previous)>) {
    for (path, previous) in placed.into_iter().rev() {
        let restored = match previous {
            Previous::Saved(saved) => saved.persist(&path).map_err(|e| e.error),
            Previous::Missing => std::fs::remove_file(&path),
        };
        match restored {
            Ok(()) => warn!(path = %path.display(), "Restored previous output"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not restore previous output"),
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
