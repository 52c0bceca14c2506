//! Migration Definitions - Core types shared by the reader, ledger and reconciler
//!
//! A `MigrationDefinition` is what the filesystem says exists, a `LedgerEntry`
//! is what the database says was applied, and a `StatusRow` is the merged view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A migration discovered on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationDefinition {
    /// Version parsed from the leading digits of the filename (typically `YYYYMMDDHHMMSS`)
    pub version: i64,
    /// CamelCase name derived from the rest of the filename
    pub name: String,
    /// Full path of the file that defined the migration
    pub source_path: PathBuf,
}

impl MigrationDefinition {
    pub fn new(version: i64, name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            version,
            name: name.into(),
            source_path: source_path.into(),
        }
    }
}

/// A row of the persisted ledger table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Applied migration version
    pub version: i64,
    /// Name recorded when the migration was applied
    pub name: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
    /// Rollback stop marker
    pub breakpoint: bool,
}

impl LedgerEntry {
    pub fn new(version: i64, name: impl Into<String>, applied_at: DateTime<Utc>) -> Self {
        Self {
            version,
            name: name.into(),
            applied_at,
            breakpoint: false,
        }
    }

    pub fn with_breakpoint(mut self, breakpoint: bool) -> Self {
        self.breakpoint = breakpoint;
        self
    }
}

/// Whether a migration is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    /// Recorded in the ledger
    Up,
    /// Known on disk, absent from the ledger
    Down,
}

impl MigrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationState::Up => "up",
            MigrationState::Down => "down",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, MigrationState::Up)
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the reconciled status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub version: i64,
    pub name: String,
    pub status: MigrationState,
    /// The ledger has this version but no file defines it any more
    pub missing: bool,
    /// The ledger recorded a different name than the file currently carries
    pub names_differ: bool,
    /// The ledger entry carries a breakpoint
    pub breakpoint: bool,
}

impl StatusRow {
    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }
}
