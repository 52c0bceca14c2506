//! # elif-migrations
//!
//! Migration status and bookkeeping for elif.rs databases.
//!
//! - [`source`] discovers migration files (`20150704160200_create_numbers_table.sql`)
//! - [`ledger`] reads and writes the table recording applied migrations
//! - [`reconcile`] merges both into an ordered `up`/`down` report, flagging
//!   applied migrations whose file has gone missing
//! - [`render`] turns the report into text or JSON
//!
//! ```no_run
//! use elif_migrations::{ledger, Migrations, MigrationsConfig, OutputFormat};
//!
//! # async fn run() -> elif_migrations::MigrationResult<()> {
//! let config = MigrationsConfig::discover(None)?;
//! let ledger = ledger::connect(config.connection_url(None)?, &config.ledger_table, false).await?;
//! let migrations = Migrations::new(config.source_reader(), config.resolve_sources(&[]), ledger.as_ref());
//!
//! let report = migrations.status().await?;
//! print!("{}", elif_migrations::render(report.rows(), OutputFormat::Text)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod definitions;
pub mod error;
pub mod ledger;
pub mod reconcile;
pub mod render;
pub mod source;
pub mod status;

pub use config::MigrationsConfig;
pub use definitions::{LedgerEntry, MigrationDefinition, MigrationState, StatusRow};
pub use error::{ConfigError, MigrationError, MigrationResult};
pub use ledger::{LedgerStore, MemoryLedger, PostgresLedger, SqliteLedger};
pub use reconcile::{reconcile, StatusReport};
pub use render::{render, render_json, render_text, OutputFormat};
pub use source::SourceReader;
pub use status::{MarkTarget, Migrations};
