//! Migration configuration
//!
//! Loaded from `migrations.yaml`, overlaid with environment variables, then
//! used to resolve the `--connection` and `--source` options of the commands.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, MigrationError, MigrationResult};
use crate::ledger::DEFAULT_LEDGER_TABLE;
use crate::source::SourceReader;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "migrations.yaml";

/// Env var pointing at an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "ELIF_MIGRATIONS_CONFIG";

/// Migration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Connection used when `--connection` is not given
    pub default_connection: String,
    /// Source used when no `--source` is given
    pub default_source: String,
    /// Name of the ledger table
    pub ledger_table: String,
    /// File extensions recognised as migrations
    pub extensions: Vec<String>,
    /// Connection name -> database URL
    pub connections: BTreeMap<String, String>,
    /// Source name -> ordered list of directories
    pub sources: BTreeMap<String, Vec<PathBuf>>,
    /// Directory relative source paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        let mut sources = BTreeMap::new();
        sources.insert("Migrations".to_string(), vec![PathBuf::from("config/Migrations")]);

        Self {
            default_connection: "default".to_string(),
            default_source: "Migrations".to_string(),
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            extensions: vec!["sql".to_string()],
            connections: BTreeMap::new(),
            sources,
            base_dir: PathBuf::from("."),
        }
    }
}

impl MigrationsConfig {
    /// Parse a YAML document; relative source paths resolve against `base_dir`
    pub fn from_yaml_str(yaml: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.base_dir = base_dir.into();
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::from_yaml_str(&yaml, base_dir)
    }

    /// Load from an explicit path, `ELIF_MIGRATIONS_CONFIG`, or `migrations.yaml`,
    /// then overlay the environment and validate.
    ///
    /// An explicit path must exist; the implicit default file may be absent.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay `DATABASE_URL` and `MIGRATIONS_LEDGER_TABLE`
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.connections
                .entry(self.default_connection.clone())
                .or_insert(url);
        }
        if let Some(table) = lookup("MIGRATIONS_LEDGER_TABLE") {
            self.ledger_table = table;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.ledger_table) {
            return Err(ConfigError::InvalidValue {
                field: "ledger_table".to_string(),
                value: self.ledger_table.clone(),
                expected: "a plain SQL identifier ([A-Za-z_][A-Za-z0-9_]*)".to_string(),
            });
        }

        if self.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(ConfigError::MissingRequired {
                field: "extensions".to_string(),
                hint: "List at least one migration file extension, e.g. [sql]".to_string(),
            });
        }

        Ok(())
    }

    /// URL of the named connection, or of the default connection
    pub fn connection_url(&self, name: Option<&str>) -> MigrationResult<&str> {
        let name = name.unwrap_or(self.default_connection.as_str());
        match self.connections.get(name) {
            Some(url) => Ok(url.as_str()),
            None if name == self.default_connection => Err(ConfigError::MissingRequired {
                field: format!("connections.{}", name),
                hint: "Set DATABASE_URL or add the connection to migrations.yaml".to_string(),
            }
            .into()),
            None => Err(MigrationError::UnknownConnection {
                name: name.to_string(),
            }),
        }
    }

    /// Expand `--source` values into ordered directories.
    ///
    /// A configured source name expands to its roots; anything else is taken
    /// as a directory path. No values means the default source.
    pub fn resolve_sources(&self, requested: &[String]) -> Vec<PathBuf> {
        let defaults = [self.default_source.clone()];
        let requested = if requested.is_empty() { &defaults[..] } else { requested };

        requested
            .iter()
            .flat_map(|value| match self.sources.get(value) {
                Some(roots) => roots.iter().map(|root| self.base_dir.join(root)).collect::<Vec<_>>(),
                None => vec![PathBuf::from(value)],
            })
            .collect()
    }

    /// A source reader for the configured extensions
    pub fn source_reader(&self) -> SourceReader {
        SourceReader::with_extensions(self.extensions.iter().filter(|ext| !ext.trim().is_empty()).cloned())
    }
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
