//! Log output for the command-line tool.

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the workspace crates log at `level`.
/// Output goes to stderr so that stdout stays free for command output.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn directives(level: &str) -> String {
    format!("tableau_export={level},tableau_client={level},tableau_rbac={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_cover_workspace_crates() {
        assert_eq!(
            directives("debug"),
            "tableau_export=debug,tableau_client=debug,tableau_rbac=debug"
        );
    }
}
