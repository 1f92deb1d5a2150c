//! `tableau-perms`: export Tableau permissions to CSV.

use clap::Parser;
use tableau_export::cli::{self, Cli};
use tableau_export::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    cli::run(cli).await
}
