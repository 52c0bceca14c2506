//! In-process ledger store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::LedgerStore;
use crate::definitions::LedgerEntry;
use crate::error::{MigrationError, MigrationResult};

/// Ledger held in memory, with the same contract as the SQL stores
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: RwLock<HashMap<i64, LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger with existing entries
    pub fn with_entries<I: IntoIterator<Item = LedgerEntry>>(entries: I) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().map(|e| (e.version, e)).collect()),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn list_applied(&self) -> MigrationResult<Vec<LedgerEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn record(&self, version: i64, name: &str, applied_at: DateTime<Utc>) -> MigrationResult<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&version) {
            return Err(MigrationError::DuplicateLedgerEntry { version });
        }
        entries.insert(version, LedgerEntry::new(version, name, applied_at));
        Ok(())
    }

    async fn remove(&self, version: i64) -> MigrationResult<()> {
        self.entries
            .write()
            .await
            .remove(&version)
            .map(|_| ())
            .ok_or(MigrationError::LedgerEntryNotFound { version })
    }
}
