//! Ledger Store - The persisted record of applied migrations
//!
//! The ledger table is the only source of truth for whether a migration is
//! "up". Stores never order their results; ordering belongs to the reconciler.

#[macro_use]
mod sql;

pub mod memory;
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::str::FromStr;

use crate::definitions::LedgerEntry;
use crate::error::{MigrationError, MigrationResult};

pub use memory::MemoryLedger;
pub use postgres::PostgresLedger;
pub use sqlite::SqliteLedger;

/// Default ledger table name
pub const DEFAULT_LEDGER_TABLE: &str = "phinxlog";

/// Read/write access to the applied-migrations ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Every applied migration, read as one snapshot.
    ///
    /// A database without a ledger table has nothing applied, so this returns
    /// an empty list instead of failing.
    async fn list_applied(&self) -> MigrationResult<Vec<LedgerEntry>>;

    /// Record `version` as applied. Fails with `DuplicateLedgerEntry` when it already is.
    async fn record(&self, version: i64, name: &str, applied_at: DateTime<Utc>) -> MigrationResult<()>;

    /// Forget `version`. Fails with `LedgerEntryNotFound` when it is not recorded.
    async fn remove(&self, version: i64) -> MigrationResult<()>;
}

/// Database backend type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    PostgreSQL,
    SQLite,
}

impl DatabaseBackendType {
    /// Determine the backend from a connection URL's scheme
    pub fn from_url(url: &str) -> MigrationResult<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        scheme
            .parse()
            .map_err(|_| MigrationError::UnsupportedBackend {
                backend: scheme.to_string(),
            })
    }
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::PostgreSQL => write!(f, "postgresql"),
            DatabaseBackendType::SQLite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseBackendType::PostgreSQL),
            "sqlite" => Ok(DatabaseBackendType::SQLite),
            _ => Err(format!("Unsupported database backend: {}", s)),
        }
    }
}

/// SQL text for the ledger table, per backend
#[derive(Debug, Clone)]
pub struct LedgerSql {
    table: String,
    backend: DatabaseBackendType,
}

impl LedgerSql {
    pub fn new(table: impl Into<String>, backend: DatabaseBackendType) -> Self {
        Self {
            table: table.into(),
            backend,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn placeholder(&self, index: usize) -> String {
        match self.backend {
            DatabaseBackendType::PostgreSQL => format!("${}", index),
            _ => format!("?{}", index),
        }
    }

    fn timestamp_type(&self) -> &'static str {
        match self.backend {
            DatabaseBackendType::PostgreSQL => "TIMESTAMPTZ",
            _ => "TIMESTAMP",
        }
    }

    /// SQL to create the ledger table
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                version BIGINT NOT NULL PRIMARY KEY,\n    \
                migration_name VARCHAR(100),\n    \
                start_time {ts} NULL,\n    \
                end_time {ts} NULL,\n    \
                breakpoint BOOLEAN NOT NULL DEFAULT FALSE\n\
            )",
            self.table,
            ts = self.timestamp_type()
        )
    }

    /// SQL returning one row when the ledger table exists, none otherwise
    pub fn table_exists_sql(&self) -> String {
        match self.backend {
            // resolves the name with the same case folding the unquoted DDL gets
            DatabaseBackendType::PostgreSQL => format!(
                "SELECT 1 WHERE to_regclass({}::text) IS NOT NULL",
                self.placeholder(1)
            ),
            DatabaseBackendType::SQLite => format!(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = {} COLLATE NOCASE",
                self.placeholder(1)
            ),
        }
    }

    /// SQL to read every ledger row
    pub fn select_applied_sql(&self) -> String {
        format!(
            "SELECT version, migration_name, start_time, breakpoint FROM {}",
            self.table
        )
    }

    /// SQL to record a migration as applied
    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (version, migration_name, start_time, end_time, breakpoint) \
             VALUES ({}, {}, {}, {}, FALSE)",
            self.table,
            self.placeholder(1),
            self.placeholder(2),
            self.placeholder(3),
            self.placeholder(4)
        )
    }

    /// SQL to remove a migration record
    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE version = {}", self.table, self.placeholder(1))
    }
}

/// Map an insert failure onto the ledger's duplicate error when it is a key collision
pub(crate) fn map_insert_error(version: i64, err: sqlx::Error) -> MigrationError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            MigrationError::DuplicateLedgerEntry { version }
        }
        _ => MigrationError::Database(err),
    }
}

/// Open a ledger over a fresh pool for `url`.
///
/// A missing SQLite database file is an error unless `create_if_missing` is set;
/// read-only commands must not report "nothing applied" for a mistyped path.
/// Only the command layer calls this; library code receives a `&dyn LedgerStore`.
pub async fn connect(url: &str, table: &str, create_if_missing: bool) -> MigrationResult<Box<dyn LedgerStore>> {
    let backend = DatabaseBackendType::from_url(url)?;
    tracing::debug!(%backend, table, "Opening ledger connection");

    match backend {
        DatabaseBackendType::PostgreSQL => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(1)
                .connect(url)
                .await?;
            Ok(Box::new(PostgresLedger::new(pool, table)))
        }
        DatabaseBackendType::SQLite => {
            let options = sqlx::sqlite::SqliteConnectOptions::from_str(url)?.create_if_missing(create_if_missing);
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await?;
            Ok(Box::new(SqliteLedger::new(pool, table)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_url() {
        assert_eq!(
            DatabaseBackendType::from_url("postgres://localhost/elif_test").unwrap(),
            DatabaseBackendType::PostgreSQL
        );
        assert_eq!(
            DatabaseBackendType::from_url("sqlite::memory:").unwrap(),
            DatabaseBackendType::SQLite
        );
        assert!(matches!(
            DatabaseBackendType::from_url("oracle://db"),
            Err(MigrationError::UnsupportedBackend { backend }) if backend == "oracle"
        ));
    }

    #[test]
    fn test_postgres_sql_generation() {
        let sql = LedgerSql::new("phinxlog", DatabaseBackendType::PostgreSQL);

        let create = sql.create_table_sql();
        assert!(create.contains("CREATE TABLE IF NOT EXISTS phinxlog"));
        assert!(create.contains("version BIGINT NOT NULL PRIMARY KEY"));
        assert!(create.contains("start_time TIMESTAMPTZ NULL"));

        assert!(sql.insert_sql().contains("VALUES ($1, $2, $3, $4, FALSE)"));
        assert_eq!(sql.delete_sql(), "DELETE FROM phinxlog WHERE version = $1");
        assert_eq!(sql.table_exists_sql(), "SELECT 1 WHERE to_regclass($1::text) IS NOT NULL");
    }

    #[test]
    fn test_sqlite_sql_generation() {
        let sql = LedgerSql::new("migrations_log", DatabaseBackendType::SQLite);

        assert!(sql.create_table_sql().contains("end_time TIMESTAMP NULL"));
        assert!(sql.insert_sql().contains("VALUES (?1, ?2, ?3, ?4, FALSE)"));
        assert_eq!(sql.delete_sql(), "DELETE FROM migrations_log WHERE version = ?1");
        assert!(sql.table_exists_sql().ends_with("name = ?1 COLLATE NOCASE"));
        assert_eq!(
            sql.select_applied_sql(),
            "SELECT version, migration_name, start_time, breakpoint FROM migrations_log"
        );
    }

    #[tokio::test]
    async fn test_connect_only_creates_sqlite_file_when_asked() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.sqlite");
        let url = format!("sqlite://{}", path.display());

        let result = connect(&url, DEFAULT_LEDGER_TABLE, false).await;
        assert!(matches!(result, Err(MigrationError::Database(_))));
        assert!(!path.exists());

        let ledger = connect(&url, DEFAULT_LEDGER_TABLE, true).await.unwrap();
        assert!(ledger.list_applied().await.unwrap().is_empty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_connect_rejects_mysql() {
        let result = connect("mysql://localhost/app", DEFAULT_LEDGER_TABLE, true).await;
        assert!(matches!(
            result,
            Err(MigrationError::UnsupportedBackend { backend }) if backend == "mysql"
        ));
    }
}
