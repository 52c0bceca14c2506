//! Status Reconciler - Merges known migrations with the ledger
//!
//! `reconcile` is a pure function: no I/O and no errors. Every version seen on
//! either side yields exactly one row, and rows always come out in ascending
//! version order.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::definitions::{LedgerEntry, MigrationDefinition, MigrationState, StatusRow};

/// Merge definitions and ledger entries into one ordered status view.
///
/// A version present in both is `up` and keeps the on-disk name. A version only
/// in the ledger is `up` and `missing`, named from the ledger. A version only on
/// disk is `down`.
pub fn reconcile(definitions: &[MigrationDefinition], ledger: &[LedgerEntry]) -> Vec<StatusRow> {
    let defined: BTreeMap<i64, &MigrationDefinition> =
        definitions.iter().map(|d| (d.version, d)).collect();
    let applied: BTreeMap<i64, &LedgerEntry> = ledger.iter().map(|e| (e.version, e)).collect();

    let mut rows: Vec<StatusRow> = defined
        .values()
        .map(|definition| match applied.get(&definition.version) {
            Some(entry) => StatusRow {
                version: definition.version,
                name: definition.name.clone(),
                status: MigrationState::Up,
                missing: false,
                names_differ: !entry.name.is_empty() && entry.name != definition.name,
                breakpoint: entry.breakpoint,
            },
            None => StatusRow {
                version: definition.version,
                name: definition.name.clone(),
                status: MigrationState::Down,
                missing: false,
                names_differ: false,
                breakpoint: false,
            },
        })
        .collect();

    // ledger-only versions: the file is gone, so the recorded name is all we have
    rows.extend(
        applied
            .values()
            .filter(|entry| !defined.contains_key(&entry.version))
            .map(|entry| StatusRow {
                version: entry.version,
                name: entry.name.clone(),
                status: MigrationState::Up,
                missing: true,
                names_differ: false,
                breakpoint: entry.breakpoint,
            }),
    );

    rows.sort_by_key(|row| row.version);
    rows
}

/// The reconciled rows plus the diagnostics derived from them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    rows: Vec<StatusRow>,
}

impl StatusReport {
    pub fn new(definitions: &[MigrationDefinition], ledger: &[LedgerEntry]) -> Self {
        Self {
            rows: reconcile(definitions, ledger),
        }
    }

    pub fn rows(&self) -> &[StatusRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<StatusRow> {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn applied_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_up()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.rows.len() - self.applied_count()
    }

    pub fn missing_count(&self) -> usize {
        self.rows.iter().filter(|r| r.missing).count()
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn latest_applied_version(&self) -> Option<i64> {
        self.rows.iter().filter(|r| r.is_up()).map(|r| r.version).max()
    }

    /// Pending migrations older than the newest applied one
    pub fn out_of_order(&self) -> Vec<&StatusRow> {
        match self.latest_applied_version() {
            Some(latest) => self
                .rows
                .iter()
                .filter(|r| !r.is_up() && r.version < latest)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Applied migrations whose file now carries a different name
    pub fn renamed(&self) -> Vec<&StatusRow> {
        self.rows.iter().filter(|r| r.names_differ).collect()
    }

    /// Log every inconsistency found in the report
    pub fn log_diagnostics(&self) {
        for row in self.rows.iter().filter(|r| r.missing) {
            tracing::warn!(version = row.version, name = %row.name, "Applied migration has no definition file");
        }
        for row in self.renamed() {
            tracing::warn!(version = row.version, name = %row.name, "Migration was renamed after it was applied");
        }
        for row in self.out_of_order() {
            tracing::warn!(version = row.version, name = %row.name, "Pending migration is older than the latest applied one");
        }
        tracing::info!(
            applied = self.applied_count(),
            pending = self.pending_count(),
            missing = self.missing_count(),
            "Migration status collected"
        );
    }
}
