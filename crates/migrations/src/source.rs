//! Migration Source Reader - Discovers migration files on disk
//!
//! Scans one or more source roots and turns every file named like
//! `20150704160200_create_numbers_table.sql` into a `MigrationDefinition`.
//! Files that do not follow the pattern are helpers and are skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::definitions::MigrationDefinition;
use crate::error::{MigrationError, MigrationResult};

static MIGRATION_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)_(\w+)\.(\w+)$").expect("migration filename pattern"));

/// Reads migration definitions from source directories
#[derive(Debug, Clone)]
pub struct SourceReader {
    extensions: Vec<String>,
}

impl SourceReader {
    /// Create a reader recognising `.sql` files
    pub fn new() -> Self {
        Self::with_extensions(["sql"])
    }

    /// Create a reader recognising the given extensions (without the leading dot)
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.into().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Discover every migration under `roots`, ordered by ascending version.
    ///
    /// Roots are scanned in the order given. A root that is not a readable
    /// directory fails the whole scan, and so does a version claimed by two files.
    pub fn discover<P: AsRef<Path>>(&self, roots: &[P]) -> MigrationResult<Vec<MigrationDefinition>> {
        let mut by_version: BTreeMap<i64, MigrationDefinition> = BTreeMap::new();

        for root in roots {
            let root = root.as_ref();
            for definition in self.scan_root(root)? {
                if let Some(existing) = by_version.get(&definition.version) {
                    return Err(MigrationError::DuplicateVersion {
                        version: definition.version,
                        first: existing.source_path.clone(),
                        second: definition.source_path,
                    });
                }
                by_version.insert(definition.version, definition);
            }
        }

        tracing::debug!(
            roots = roots.len(),
            migrations = by_version.len(),
            "Discovered migration definitions"
        );

        Ok(by_version.into_values().collect())
    }

    fn scan_root(&self, root: &Path) -> MigrationResult<Vec<MigrationDefinition>> {
        if !root.is_dir() {
            return Err(MigrationError::SourceNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        // read_dir order is platform dependent
        paths.sort();

        let mut definitions = Vec::new();
        for path in paths {
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            match self.parse_filename(file_name) {
                Some((version, name)) => definitions.push(MigrationDefinition::new(version, name, path.clone())),
                None => tracing::debug!(file = %path.display(), "Skipping non-migration file"),
            }
        }

        Ok(definitions)
    }

    /// Split a filename into `(version, name)`, or `None` when it is not a migration
    pub fn parse_filename(&self, file_name: &str) -> Option<(i64, String)> {
        let captures = MIGRATION_FILENAME.captures(file_name)?;

        let extension = captures[3].to_lowercase();
        if !self.extensions.iter().any(|ext| *ext == extension) {
            return None;
        }

        let version = match captures[1].parse::<i64>() {
            Ok(version) => version,
            Err(_) => {
                tracing::warn!(file = file_name, "Migration version does not fit in 64 bits, skipping");
                return None;
            }
        };

        let name = camel_case(&captures[2]);
        if name.is_empty() {
            return None;
        }

        Some((version, name))
    }
}

impl Default for SourceReader {
    fn default() -> Self {
        Self::new()
    }
}

/// `update_numbers_table` -> `UpdateNumbersTable`
fn camel_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
