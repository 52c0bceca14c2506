//! SQLite ledger store

use sqlx::SqlitePool;

use super::DatabaseBackendType;

sql_ledger!(
    /// Ledger stored in a SQLite table
    SqliteLedger,
    SqlitePool,
    DatabaseBackendType::SQLite
);
