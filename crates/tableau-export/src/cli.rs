//! # Command Line
//!
//! ```text
//! tableau-perms --server 10ax --site finance projects
//! tableau-perms export --root <project-id> --kinds workbook,view \
//!     --group-members --output finance.csv
//! ```
//!
//! Every global flag can also be set from the environment:
//!
//! | Flag | Variable |
//! |------|----------|
//! | `--server` | `TABLEAU_SERVER` |
//! | `--site` | `TABLEAU_SITE` |
//! | `--pat-name` | `TABLEAU_PAT_NAME` |
//! | `--pat-secret` | `TABLEAU_PAT_SECRET` |
//! | `--api-version` | `TABLEAU_API_VERSION` |
//! | `--log-level` | `TABLEAU_LOG_LEVEL` |

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};

use tableau_client::config::normalize_server_url;
use tableau_client::{ClientConfig, ConfigError, Session};
use tableau_rbac::ContentKind;

use crate::exporter::{ExportRequest, Exporter, DEFAULT_CONCURRENCY};
use crate::progress::{progress_channel, CancelFlag, ProgressEvent, ProgressReceiver};
use crate::walker::{ProjectNode, RootSelection};
use crate::warnings::write_warnings;

/// Export Tableau permissions to CSV.
#[derive(Debug, Parser)]
#[command(name = "tableau-perms", version)]
#[command(about = "Export Tableau Cloud/Server permissions to CSV")]
pub struct Cli {
    /// Server URL, or a Tableau Cloud pod name such as `10ax`.
    #[arg(long, env = "TABLEAU_SERVER", global = true)]
    pub server: Option<String>,

    /// Site content URL. Empty for the default site.
    #[arg(long, env = "TABLEAU_SITE", default_value = "", global = true)]
    pub site: String,

    /// Personal access token name.
    #[arg(long, env = "TABLEAU_PAT_NAME", global = true)]
    pub pat_name: Option<String>,

    /// Personal access token secret.
    #[arg(long, env = "TABLEAU_PAT_SECRET", hide_env_values = true, global = true)]
    pub pat_secret: Option<String>,

    /// REST API version.
    #[arg(long, env = "TABLEAU_API_VERSION", global = true)]
    pub api_version: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "TABLEAU_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the project hierarchy with project IDs.
    Projects,
    /// Export permissions to a CSV report.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Root project ID. Repeat for several roots.
    #[arg(
        long = "root",
        value_name = "PROJECT_ID",
        required_unless_present = "all_roots",
        conflicts_with = "all_roots"
    )]
    pub roots: Vec<String>,

    /// Start from every top-level project.
    #[arg(long)]
    pub all_roots: bool,

    /// Content types to report, comma separated. Defaults to all.
    #[arg(long, value_delimiter = ',', value_parser = parse_kind)]
    pub kinds: Vec<ContentKind>,

    /// Expand group grants into one row per member.
    #[arg(long)]
    pub group_members: bool,

    /// Report file.
    #[arg(long, short, default_value = "permissions.csv")]
    pub output: PathBuf,

    /// Permission requests in flight at once.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Also write warnings as JSON to this file.
    #[arg(long)]
    pub warnings_file: Option<PathBuf>,

    /// Add a row for items without any grant.
    #[arg(long)]
    pub include_unassigned: bool,
}

impl Cli {
    /// Client configuration from the environment, overridden by flags.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::from_env();
        if let Some(server) = &self.server {
            config.server_url = normalize_server_url(server);
        }
        if let Some(version) = &self.api_version {
            config.api_version = version.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

impl ExportArgs {
    /// The export these arguments describe.
    pub fn request(&self) -> ExportRequest {
        let roots = if self.all_roots {
            RootSelection::All
        } else {
            RootSelection::Projects(self.roots.clone())
        };
        let kinds = if self.kinds.is_empty() {
            ContentKind::all().to_vec()
        } else {
            self.kinds.clone()
        };

        ExportRequest::new(roots, self.output.clone())
            .with_kinds(kinds)
            .with_group_members(self.group_members)
            .with_concurrency(self.concurrency)
            .with_unassigned(self.include_unassigned)
    }
}

fn parse_kind(s: &str) -> Result<ContentKind, String> {
    ContentKind::parse(s).ok_or_else(|| {
        let known: Vec<&str> = ContentKind::all().iter().map(|k| k.as_str()).collect();
        format!("unknown content type '{s}', expected one of: {}", known.join(", "))
    })
}

/// Sign in, run the command and sign out.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.client_config().context("Invalid configuration")?;
    let pat_name = cli
        .pat_name
        .as_deref()
        .context("Missing --pat-name (or TABLEAU_PAT_NAME)")?;
    let pat_secret = cli
        .pat_secret
        .as_deref()
        .context("Missing --pat-secret (or TABLEAU_PAT_SECRET)")?;

    let session = Session::sign_in(config, pat_name, pat_secret, &cli.site)
        .await
        .context("Sign-in failed")?;
    info!(site = %session.site().content_url, "Signed in");

    let result = match &cli.command {
        Command::Projects => print_projects(&session).await,
        Command::Export(args) => export(&session, args).await,
    };

    session.sign_out().await;
    result
}

async fn print_projects(session: &Session) -> anyhow::Result<()> {
    let tree = Exporter::new(session).project_tree().await?;
    print!("{}", render_tree(&tree));
    Ok(())
}

async fn export(session: &Session, args: &ExportArgs) -> anyhow::Result<()> {
    let request = args.request();
    let cancel = CancelFlag::new();

    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling export");
                cancel.cancel();
            }
        }
    });

    let (sender, receiver) = progress_channel();
    let reporter = tokio::spawn(log_progress(receiver));

    let outcome = Exporter::new(session)
        .with_cancel(cancel)
        .with_progress(sender)
        .run(&request)
        .await;

    interrupt.abort();
    // The sender went away with the exporter, so the reporter drains and ends.
    if let Err(e) = reporter.await {
        debug!(error = %e, "Progress reporter ended abnormally");
    }

    let summary = outcome?;
    if summary.cancelled {
        println!(
            "Export cancelled after {} of {} items, nothing written",
            summary.items_processed, summary.items_total
        );
        return Ok(());
    }

    if let Some(path) = &args.warnings_file {
        write_warnings(path, &summary.warnings)?;
    }
    println!(
        "{} items processed, {} warnings",
        summary.items_processed,
        summary.warnings.len()
    );
    Ok(())
}

async fn log_progress(mut receiver: ProgressReceiver) {
    while let Some(event) = receiver.recv().await {
        match event {
            ProgressEvent::Started { total } => info!(total, "Fetching permissions"),
            ProgressEvent::ItemProcessed {
                index,
                total,
                path,
                grants,
            } => info!(grants, "[{index}/{total}] {path}"),
            // Already logged where it was recorded.
            ProgressEvent::Warning(_) => {}
            ProgressEvent::Finished {
                items_processed,
                cancelled,
            } => debug!(items_processed, cancelled, "Progress finished"),
        }
    }
}

/// Indented `name (id)` lines, one per project.
pub fn render_tree(nodes: &[ProjectNode]) -> String {
    fn render(nodes: &[ProjectNode], depth: usize, out: &mut String) {
        for node in nodes {
            let _ = writeln!(
                out,
                "{:indent$}{} ({})",
                "",
                node.item.name,
                node.item.id,
                indent = depth * 2
            );
            render(&node.children, depth + 1, out);
        }
    }

    let mut out = String::new();
    render(nodes, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tableau_rbac::ContentItem;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_args() {
        let cli = Cli::try_parse_from([
            "tableau-perms",
            "export",
            "--root",
            "p1",
            "--root",
            "p2",
            "--kinds",
            "workbook,views",
            "--group-members",
            "--output",
            "out.csv",
            "--concurrency",
            "8",
        ])
        .unwrap();

        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        let request = args.request();
        assert_eq!(
            request.roots,
            RootSelection::Projects(vec!["p1".into(), "p2".into()])
        );
        assert_eq!(request.kinds, vec![ContentKind::Workbook, ContentKind::View]);
        assert!(request.include_group_members);
        assert!(!request.include_unassigned);
        assert_eq!(request.concurrency, 8);
        assert_eq!(request.output, PathBuf::from("out.csv"));
    }

    #[test]
    fn test_export_defaults_to_all_kinds() {
        let cli = Cli::try_parse_from(["tableau-perms", "export", "--all-roots"]).unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        let request = args.request();
        assert_eq!(request.roots, RootSelection::All);
        assert_eq!(request.kinds, ContentKind::all().to_vec());
        assert_eq!(request.output, PathBuf::from("permissions.csv"));
    }

    #[test]
    fn test_export_requires_roots() {
        assert!(Cli::try_parse_from(["tableau-perms", "export"]).is_err());
        assert!(
            Cli::try_parse_from(["tableau-perms", "export", "--root", "p1", "--all-roots"])
                .is_err()
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = Cli::try_parse_from([
            "tableau-perms",
            "export",
            "--all-roots",
            "--kinds",
            "lens",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("unknown content type 'lens'"));
    }

    #[test]
    fn test_render_tree() {
        let tree = vec![ProjectNode {
            item: ContentItem::new("p1", "Sales", ContentKind::Project),
            children: vec![ProjectNode {
                item: ContentItem::new("p2", "EMEA", ContentKind::Project).with_parent("p1"),
                children: Vec::new(),
            }],
        }];
        assert_eq!(render_tree(&tree), "Sales (p1)\n  EMEA (p2)\n");
    }
}
