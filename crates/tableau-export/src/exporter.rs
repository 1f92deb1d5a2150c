//! # Export Runner
//!
//! Drives one export: walk the selected projects, fetch and resolve each
//! item's permissions with bounded concurrency, optionally expand group
//! membership, and write the report.
//!
//! ## Failure policy
//!
//! - Authentication failures end the run with [`ExportError::Auth`]
//! - Deleted, unreadable or repeatedly failing items become warnings
//! - A failed write ends the run with [`ExportError::Write`]
//!
//! ## Cancellation
//!
//! The [`CancelFlag`] is checked before each item's requests. Once it is
//! raised no new request is issued, partial results are dropped and nothing
//! is written.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use tableau_client::{ApiResult, ContentApi};
use tableau_rbac::{resolve, CapabilityGrant, ContentItem, ContentKind, PermissionRule};

use crate::error::{ExportError, ExportResult};
use crate::membership::{referenced_groups, MembershipFetcher, Memberships, PrincipalDirectory};
use crate::progress::{CancelFlag, Progress, ProgressEvent, ProgressSender};
use crate::report::{
    build_rows, commit_all, group_member_rows, group_members_path, stage_group_members,
    stage_report, ItemGrants,
};
use crate::walker::{ContentWalker, ProjectNode, RootSelection, WalkedItem};
use crate::warnings::ExportWarning;

/// Permission requests in flight at once, unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What to export and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Projects to start from.
    pub roots: RootSelection,
    /// Kinds of content to report.
    pub kinds: Vec<ContentKind>,
    /// Expand group grants into one row per member and write the
    /// group-member file.
    pub include_group_members: bool,
    /// Report destination.
    pub output: PathBuf,
    /// Permission requests in flight at once.
    pub concurrency: usize,
    /// Emit a placeholder row for items without grants.
    pub include_unassigned: bool,
}

impl ExportRequest {
    /// Export every kind under `roots` to `output`.
    pub fn new(roots: RootSelection, output: impl Into<PathBuf>) -> Self {
        Self {
            roots,
            kinds: ContentKind::all().to_vec(),
            include_group_members: false,
            output: output.into(),
            concurrency: DEFAULT_CONCURRENCY,
            include_unassigned: false,
        }
    }

    /// Restrict the kinds reported.
    pub fn with_kinds(mut self, kinds: impl Into<Vec<ContentKind>>) -> Self {
        self.kinds = kinds.into();
        self
    }

    /// Expand group membership.
    pub fn with_group_members(mut self, enabled: bool) -> Self {
        self.include_group_members = enabled;
        self
    }

    /// Set the number of requests in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Report items without grants.
    pub fn with_unassigned(mut self, enabled: bool) -> Self {
        self.include_unassigned = enabled;
        self
    }

    fn validate(&self) -> ExportResult<()> {
        if self.kinds.is_empty() {
            return Err(ExportError::InvalidRequest(
                "no content kinds selected".to_string(),
            ));
        }
        if matches!(&self.roots, RootSelection::Projects(ids) if ids.is_empty()) {
            return Err(ExportError::InvalidRequest(
                "no root projects selected".to_string(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ExportError::InvalidRequest(
                "no output file given".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished or was cancelled.
    pub finished_at: DateTime<Utc>,
    /// Items the walk reached.
    pub items_total: usize,
    /// Items whose permission requests completed, successfully or not.
    pub items_processed: usize,
    /// Resolved grants across all items.
    pub grants: usize,
    /// Rows written to the report.
    pub rows: usize,
    /// Groups whose members were fetched.
    pub groups_expanded: usize,
    /// Problems skipped over, in the order they were met.
    pub warnings: Vec<ExportWarning>,
    /// Whether the run stopped early. Nothing is written when set.
    pub cancelled: bool,
    /// Report written, if any.
    pub output: Option<PathBuf>,
    /// Group-member file written, if any.
    pub group_members_output: Option<PathBuf>,
}

/// Exports the permissions of one site.
pub struct Exporter<'a> {
    api: &'a dyn ContentApi,
    cancel: CancelFlag,
    progress: Progress,
}

impl<'a> Exporter<'a> {
    /// Create an exporter over a site.
    pub fn new(api: &'a dyn ContentApi) -> Self {
        Self {
            api,
            cancel: CancelFlag::new(),
            progress: Progress::default(),
        }
    }

    /// Use a cancellation flag shared with the caller.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Send progress events to `sender`.
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Progress::new(Some(sender));
        self
    }

    /// The flag that cancels this exporter's runs.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Project hierarchy for root selection.
    pub async fn project_tree(&self) -> ExportResult<Vec<ProjectNode>> {
        ContentWalker::new(self.api).project_tree().await
    }

    /// Run an export.
    #[instrument(skip(self, request), fields(output = %request.output.display()))]
    pub async fn run(&self, request: &ExportRequest) -> ExportResult<ExportSummary> {
        request.validate()?;
        let started_at = Utc::now();
        let concurrency = request.concurrency.max(1);
        let mut warnings = Vec::new();

        info!(kinds = ?request.kinds, concurrency, "Starting export");

        let walk = ContentWalker::new(self.api)
            .walk(&request.roots, &request.kinds)
            .await?;
        for warning in walk.warnings {
            self.record(&mut warnings, warning);
        }

        let total = walk.items.len();
        self.progress.emit(ProgressEvent::Started { total });

        // One entry per processed item; `None` for items that failed.
        let mut outcomes: Vec<Option<Vec<CapabilityGrant>>> = Vec::with_capacity(total);
        {
            let mut fetches = stream::iter(walk.items.iter())
                .map(|walked| self.fetch_rules(walked))
                .buffered(concurrency);

            while let Some(fetched) = fetches.next().await {
                let Some(fetched) = fetched else {
                    break;
                };
                let index = outcomes.len() + 1;
                let walked = &walk.items[index - 1];

                let grants = match fetched {
                    Ok(rules) => {
                        let resolution = resolve(&rules);
                        for warning in resolution.warnings {
                            self.record(&mut warnings, warning.into());
                        }
                        Some(resolution.grants)
                    }
                    Err(e) if e.is_auth() => {
                        warn!(error = %e, "Session rejected, aborting export");
                        return Err(e.into());
                    }
                    Err(e) => {
                        warn!(path = %walked.path, error = %e, "Skipping item");
                        self.record(
                            &mut warnings,
                            ExportWarning::for_item(&walked.item, &walked.path, &e),
                        );
                        None
                    }
                };

                self.progress.emit(ProgressEvent::ItemProcessed {
                    index,
                    total,
                    path: walked.path.clone(),
                    grants: grants.as_ref().map_or(0, Vec::len),
                });
                outcomes.push(grants);
            }
        }

        let items_processed = outcomes.len();
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(started_at, total, items_processed, warnings));
        }

        let all_grants: Vec<CapabilityGrant> =
            outcomes.iter().flatten().flatten().cloned().collect();

        let directory = if all_grants.is_empty() {
            PrincipalDirectory::default()
        } else {
            let (directory, lookup_warnings) = PrincipalDirectory::fetch(self.api).await?;
            for warning in lookup_warnings {
                self.record(&mut warnings, warning);
            }
            directory
        };

        let memberships = if request.include_group_members {
            let groups = referenced_groups(&all_grants);
            let (memberships, membership_warnings) = MembershipFetcher::new(self.api, concurrency)
                .fetch(&groups, &self.cancel)
                .await?;
            for warning in membership_warnings {
                self.record(&mut warnings, warning);
            }
            Some(memberships)
        } else {
            None
        };

        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(started_at, total, items_processed, warnings));
        }

        let entries: Vec<ItemGrants<'_>> = walk
            .items
            .iter()
            .zip(&outcomes)
            .filter_map(|(item, grants)| {
                grants.as_deref().map(|grants| ItemGrants { item, grants })
            })
            .collect();
        let rows = build_rows(
            &entries,
            &directory,
            memberships.as_ref(),
            request.include_unassigned,
        );

        // Both outputs are replaced together or not at all.
        let mut staged = vec![stage_report(&request.output, &rows)?];
        let group_members_output = match &memberships {
            Some(memberships) => {
                let path = group_members_path(&request.output);
                staged.push(stage_group_members(
                    &path,
                    &group_member_rows(memberships, &directory),
                )?);
                Some(path)
            }
            None => None,
        };
        commit_all(staged)?;

        self.progress.emit(ProgressEvent::Finished {
            items_processed,
            cancelled: false,
        });
        info!(
            items = items_processed,
            grants = all_grants.len(),
            rows = rows.len(),
            warnings = warnings.len(),
            "Export complete"
        );

        Ok(ExportSummary {
            started_at,
            finished_at: Utc::now(),
            items_total: total,
            items_processed,
            grants: all_grants.len(),
            rows: rows.len(),
            groups_expanded: memberships.as_ref().map_or(0, Memberships::len),
            warnings,
            cancelled: false,
            output: Some(request.output.clone()),
            group_members_output,
        })
    }

    /// Fetch an item's rules, plus a project's default rules. `None` when
    /// the run was cancelled before the item started.
    async fn fetch_rules(&self, walked: &WalkedItem) -> Option<ApiResult<Vec<PermissionRule>>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(self.item_rules(&walked.item).await)
    }

    async fn item_rules(&self, item: &ContentItem) -> ApiResult<Vec<PermissionRule>> {
        let mut rules = self.api.get_permissions(item).await?;
        if item.kind == ContentKind::Project {
            for &kind in ContentKind::default_permission_kinds() {
                rules.extend(self.api.get_default_permissions(&item.id, kind).await?);
            }
        }
        Ok(rules)
    }

    fn record(&self, warnings: &mut Vec<ExportWarning>, warning: ExportWarning) {
        self.progress.emit(ProgressEvent::Warning(warning.clone()));
        warnings.push(warning);
    }

    fn cancelled(
        &self,
        started_at: DateTime<Utc>,
        total: usize,
        items_processed: usize,
        warnings: Vec<ExportWarning>,
    ) -> ExportSummary {
        info!(items = items_processed, total, "Export cancelled, nothing written");
        self.progress.emit(ProgressEvent::Finished {
            items_processed,
            cancelled: true,
        });

        ExportSummary {
            started_at,
            finished_at: Utc::now(),
            items_total: total,
            items_processed,
            grants: 0,
            rows: 0,
            groups_expanded: 0,
            warnings,
            cancelled: true,
            output: None,
            group_members_output: None,
        }
    }
}
