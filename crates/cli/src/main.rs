mod commands;
mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use elif_migrations::{MarkTarget, MigrationError, MigrationsConfig, OutputFormat};
use std::path::PathBuf;

use commands::migrate::{self, Selection};

#[derive(Parser)]
#[command(name = "elif-migrate")]
#[command(about = "Migration status and bookkeeping for elif.rs databases")]
struct Cli {
    /// Configuration file (defaults to migrations.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which migrations are applied, pending or missing
    Status {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: FormatArg,
    },

    /// Record pending migrations as applied without running them
    MarkMigrated {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Mark migrations up to and including this version
        #[arg(long)]
        target: Option<i64>,

        /// With --target, mark only that version
        #[arg(long, requires = "target")]
        only: bool,
    },

    /// Remove a migration from the ledger without rolling it back
    Unmark {
        /// Configured connection to use
        #[arg(long, short)]
        connection: Option<String>,

        /// Migration version
        version: i64,
    },
}

#[derive(Args)]
struct SelectionArgs {
    /// Configured connection to use
    #[arg(long, short)]
    connection: Option<String>,

    /// Source name or directory; repeat to scan several in order
    #[arg(long, short)]
    source: Vec<String>,
}

impl From<SelectionArgs> for Selection {
    fn from(args: SelectionArgs) -> Self {
        Self {
            connection: args.connection,
            sources: args.source,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(logging::LoggingConfig::from_flags(cli.verbose, cli.log_json)) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), MigrationError> {
    let config = MigrationsConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Status { selection, format } => {
            migrate::status(&config, &selection.into(), format.into()).await?;
        }
        Commands::MarkMigrated { selection, target, only } => {
            let target = match (target, only) {
                (Some(version), true) => MarkTarget::Only(version),
                (Some(version), false) => MarkTarget::UpTo(version),
                (None, _) => MarkTarget::All,
            };
            migrate::mark_migrated(&config, &selection.into(), target).await?;
        }
        Commands::Unmark { connection, version } => {
            migrate::unmark(&config, connection.as_deref(), version).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_status_flags() {
        let cli = Cli::parse_from([
            "elif-migrate",
            "status",
            "--connection",
            "test",
            "--source",
            "TestsMigrations",
            "--source",
            "plugins/Blog/migrations",
            "--format",
            "json",
        ]);

        match cli.command {
            Commands::Status { selection, format } => {
                let selection: Selection = selection.into();
                assert_eq!(selection.connection.as_deref(), Some("test"));
                assert_eq!(selection.sources, vec!["TestsMigrations", "plugins/Blog/migrations"]);
                assert_eq!(OutputFormat::from(format), OutputFormat::Json);
            }
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_status_defaults_to_text() {
        let cli = Cli::parse_from(["elif-migrate", "status"]);
        match cli.command {
            Commands::Status { format, .. } => assert_eq!(OutputFormat::from(format), OutputFormat::Text),
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_only_requires_target() {
        assert!(Cli::try_parse_from(["elif-migrate", "mark-migrated", "--only"]).is_err());
        assert!(Cli::try_parse_from(["elif-migrate", "mark-migrated", "--target", "20150704160200", "--only"]).is_ok());
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(Cli::try_parse_from(["elif-migrate", "status", "--format", "yaml"]).is_err());
    }
}
