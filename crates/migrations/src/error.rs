//! Error types for the migration system
//!
//! Structural problems (a missing source root, two files claiming the same
//! version, ledger write collisions) are errors. Data-level drift such as a
//! ledger entry whose file disappeared is not: it is reported as a status row.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration bookkeeping
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error(
        "Duplicate migration version {version}: {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateVersion {
        version: i64,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Migration {version} is already recorded in the ledger")]
    DuplicateLedgerEntry { version: i64 },

    #[error("Migration {version} is not recorded in the ledger")]
    LedgerEntryNotFound { version: i64 },

    #[error("Unknown migration version: {version}")]
    UnknownMigration { version: i64 },

    #[error("Unknown connection '{name}'")]
    UnknownConnection { name: String },

    #[error("Unsupported database backend: {backend}")]
    UnsupportedBackend { backend: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration errors, raised while loading or resolving `migrations.yaml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Failed to read configuration file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] serde_yaml::Error),
}
