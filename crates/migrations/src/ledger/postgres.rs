//! PostgreSQL ledger store

use sqlx::PgPool;

use super::DatabaseBackendType;

sql_ledger!(
    /// Ledger stored in a PostgreSQL table
    PostgresLedger,
    PgPool,
    DatabaseBackendType::PostgreSQL
);
