//! The `LedgerStore` body shared by the sqlx-backed ledgers
//!
//! Backends differ only in their pool type and in the SQL text `LedgerSql`
//! builds for them, so the store itself is written once and stamped out per pool.

/// Define a ledger store over a concrete sqlx pool type
macro_rules! sql_ledger {
    ($(#[$meta:meta])* $name:ident, $pool:ty, $backend:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pool: $pool,
            sql: $crate::ledger::LedgerSql,
        }

        impl $name {
            /// Wrap an existing pool; the pool stays owned by the caller
            pub fn new(pool: $pool, table: &str) -> Self {
                Self {
                    pool,
                    sql: $crate::ledger::LedgerSql::new(table, $backend),
                }
            }

            pub fn pool(&self) -> &$pool {
                &self.pool
            }

            async fn table_exists(&self) -> $crate::error::MigrationResult<bool> {
                let row = sqlx::query(&self.sql.table_exists_sql())
                    .bind(self.sql.table())
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(row.is_some())
            }

            async fn ensure_table(&self) -> $crate::error::MigrationResult<()> {
                sqlx::query(&self.sql.create_table_sql()).execute(&self.pool).await?;
                Ok(())
            }
        }

        #[async_trait::async_trait]
        impl $crate::ledger::LedgerStore for $name {
            async fn list_applied(&self) -> $crate::error::MigrationResult<Vec<$crate::definitions::LedgerEntry>> {
                use sqlx::Row;

                if !self.table_exists().await? {
                    tracing::debug!(table = self.sql.table(), "Ledger table does not exist yet");
                    return Ok(Vec::new());
                }

                let rows = sqlx::query(&self.sql.select_applied_sql())
                    .fetch_all(&self.pool)
                    .await?;

                let mut entries = Vec::with_capacity(rows.len());
                for row in rows {
                    let name: Option<String> = row.try_get("migration_name")?;
                    // ledgers written by other tools may use a zone-less timestamp column
                    let applied_at = match row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("start_time") {
                        Ok(applied_at) => applied_at,
                        Err(_) => row
                            .try_get::<Option<chrono::NaiveDateTime>, _>("start_time")?
                            .map(|naive| chrono::TimeZone::from_utc_datetime(&chrono::Utc, &naive)),
                    };
                    entries.push(
                        $crate::definitions::LedgerEntry::new(
                            row.try_get("version")?,
                            name.unwrap_or_default(),
                            applied_at.unwrap_or_default(),
                        )
                        .with_breakpoint(row.try_get("breakpoint")?),
                    );
                }

                Ok(entries)
            }

            async fn record(
                &self,
                version: i64,
                name: &str,
                applied_at: chrono::DateTime<chrono::Utc>,
            ) -> $crate::error::MigrationResult<()> {
                self.ensure_table().await?;

                sqlx::query(&self.sql.insert_sql())
                    .bind(version)
                    .bind(name)
                    .bind(applied_at)
                    .bind(applied_at)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| $crate::ledger::map_insert_error(version, e))?;

                Ok(())
            }

            async fn remove(&self, version: i64) -> $crate::error::MigrationResult<()> {
                if !self.table_exists().await? {
                    return Err($crate::error::MigrationError::LedgerEntryNotFound { version });
                }

                let result = sqlx::query(&self.sql.delete_sql())
                    .bind(version)
                    .execute(&self.pool)
                    .await?;

                if result.rows_affected() == 0 {
                    return Err($crate::error::MigrationError::LedgerEntryNotFound { version });
                }
                Ok(())
            }
        }
    };
}
