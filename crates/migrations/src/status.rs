//! Migration bookkeeping façade
//!
//! Ties the source reader, a caller-owned ledger and the reconciler together.
//! Nothing here executes migration bodies; `mark_migrated` and `unmark` only
//! touch the ledger.

use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::definitions::MigrationDefinition;
use crate::error::{MigrationError, MigrationResult};
use crate::ledger::LedgerStore;
use crate::reconcile::StatusReport;
use crate::source::SourceReader;

/// Which pending migrations `mark_migrated` records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkTarget {
    /// Every pending migration
    All,
    /// Only this version
    Only(i64),
    /// Every pending migration up to and including this version
    UpTo(i64),
}

/// Status and bookkeeping over a set of source roots and one ledger
pub struct Migrations<'a> {
    reader: SourceReader,
    roots: Vec<PathBuf>,
    ledger: &'a dyn LedgerStore,
}

impl<'a> Migrations<'a> {
    pub fn new(reader: SourceReader, roots: Vec<PathBuf>, ledger: &'a dyn LedgerStore) -> Self {
        Self { reader, roots, ledger }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Discover definitions from every root
    pub fn definitions(&self) -> MigrationResult<Vec<MigrationDefinition>> {
        self.reader.discover(&self.roots)
    }

    /// Reconcile the sources with the ledger
    pub async fn status(&self) -> MigrationResult<StatusReport> {
        let definitions = self.definitions()?;
        let ledger = self.ledger.list_applied().await?;

        let report = StatusReport::new(&definitions, &ledger);
        report.log_diagnostics();
        Ok(report)
    }

    /// Record pending migrations as applied without running them.
    ///
    /// Returns the versions that were recorded, ascending.
    pub async fn mark_migrated(&self, target: MarkTarget) -> MigrationResult<Vec<i64>> {
        let definitions = self.definitions()?;
        let applied: HashSet<i64> = self
            .ledger
            .list_applied()
            .await?
            .into_iter()
            .map(|entry| entry.version)
            .collect();

        if let MarkTarget::Only(version) | MarkTarget::UpTo(version) = target {
            if !definitions.iter().any(|d| d.version == version) {
                return Err(MigrationError::UnknownMigration { version });
            }
        }

        let selected = definitions.iter().filter(|d| match target {
            MarkTarget::All => true,
            MarkTarget::Only(version) => d.version == version,
            MarkTarget::UpTo(version) => d.version <= version,
        });

        let mut marked = Vec::new();
        for definition in selected {
            if applied.contains(&definition.version) {
                tracing::debug!(version = definition.version, "Already applied, skipping");
                continue;
            }
            self.ledger
                .record(definition.version, &definition.name, Utc::now())
                .await?;
            tracing::info!(version = definition.version, name = %definition.name, "Marked migration as applied");
            marked.push(definition.version);
        }

        Ok(marked)
    }

    /// Remove a version from the ledger without rolling it back
    pub async fn unmark(&self, version: i64) -> MigrationResult<()> {
        self.ledger.remove(version).await?;
        tracing::info!(version, "Removed migration from the ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::LedgerEntry;
    use crate::ledger::MemoryLedger;
    use std::fs;
    use tempfile::TempDir;

    fn source_dir() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for name in [
            "20150704160200_create_numbers_table.sql",
            "20150724233100_update_numbers_table.sql",
            "20150826191400_create_letters_table.sql",
        ] {
            fs::write(temp_dir.path().join(name), "").unwrap();
        }
        temp_dir
    }

    fn migrations<'a>(dir: &TempDir, ledger: &'a MemoryLedger) -> Migrations<'a> {
        Migrations::new(SourceReader::new(), vec![dir.path().to_path_buf()], ledger)
    }

    #[tokio::test]
    async fn test_status_reads_both_sides() {
        let dir = source_dir();
        let ledger = MemoryLedger::with_entries(vec![LedgerEntry::new(
            20150704160200,
            "CreateNumbersTable",
            Utc::now(),
        )]);

        let report = migrations(&dir, &ledger).status().await.unwrap();

        assert_eq!(report.rows().len(), 3);
        assert_eq!(report.applied_count(), 1);
        assert!(report.rows()[0].is_up());
    }

    #[tokio::test]
    async fn test_status_fails_on_missing_root() {
        let dir = source_dir();
        let ledger = MemoryLedger::new();
        let missing = dir.path().join("plugins");
        let migrations = Migrations::new(SourceReader::new(), vec![dir.path().to_path_buf(), missing], &ledger);

        let err = migrations.status().await.unwrap_err();
        assert!(matches!(err, MigrationError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_mark_all() {
        let dir = source_dir();
        let ledger = MemoryLedger::new();
        let migrations = migrations(&dir, &ledger);

        let marked = migrations.mark_migrated(MarkTarget::All).await.unwrap();
        assert_eq!(marked, vec![20150704160200, 20150724233100, 20150826191400]);
        assert!(migrations.status().await.unwrap().is_up_to_date());

        let again = migrations.mark_migrated(MarkTarget::All).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_mark_only_and_up_to() {
        let dir = source_dir();
        let ledger = MemoryLedger::new();
        let migrations = migrations(&dir, &ledger);

        let marked = migrations.mark_migrated(MarkTarget::Only(20150724233100)).await.unwrap();
        assert_eq!(marked, vec![20150724233100]);

        let marked = migrations.mark_migrated(MarkTarget::UpTo(20150724233100)).await.unwrap();
        assert_eq!(marked, vec![20150704160200]);

        let report = migrations.status().await.unwrap();
        assert_eq!(report.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_unknown_version() {
        let dir = source_dir();
        let ledger = MemoryLedger::new();

        let err = migrations(&dir, &ledger)
            .mark_migrated(MarkTarget::Only(42))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::UnknownMigration { version: 42 }));
        assert!(ledger.list_applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unmark() {
        let dir = source_dir();
        let ledger = MemoryLedger::new();
        let migrations = migrations(&dir, &ledger);
        migrations.mark_migrated(MarkTarget::All).await.unwrap();

        migrations.unmark(20150826191400).await.unwrap();
        let report = migrations.status().await.unwrap();
        assert!(!report.rows()[2].is_up());

        let err = migrations.unmark(20150826191400).await.unwrap_err();
        assert!(matches!(err, MigrationError::LedgerEntryNotFound { .. }));
    }
}
