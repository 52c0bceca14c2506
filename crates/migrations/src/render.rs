//! Report Renderer - Text table and JSON output for status rows

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::definitions::{MigrationState, StatusRow};
use crate::error::{ConfigError, MigrationResult};

const MISSING_MARKER: &str = "** MISSING **";
const BREAKPOINT_MARKER: &str = "BREAKPOINT SET";
const NO_MIGRATIONS: &str = "There are no available migrations.";

/// Output format of the status report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::InvalidValue {
                field: "format".to_string(),
                value: s.to_string(),
                expected: "text or json".to_string(),
            }),
        }
    }
}

/// One element of the JSON array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonStatusRow {
    pub status: MigrationState,
    pub id: String,
    pub name: String,
}

impl From<&StatusRow> for JsonStatusRow {
    fn from(row: &StatusRow) -> Self {
        Self {
            status: row.status,
            id: row.version.to_string(),
            name: row.name.clone(),
        }
    }
}

/// Render rows in the requested format
pub fn render(rows: &[StatusRow], format: OutputFormat) -> MigrationResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text(rows)),
        OutputFormat::Json => render_json(rows),
    }
}

/// One line per row: `<status>  <version>  <name>[  ** MISSING **]`
pub fn render_text(rows: &[StatusRow]) -> String {
    if rows.is_empty() {
        return format!("{}\n", NO_MIGRATIONS);
    }

    let mut output = String::new();
    for row in rows {
        output.push_str(&format!("{:>4}  {}  {}", row.status.as_str(), row.version, row.name));
        if row.missing {
            output.push_str("  ");
            output.push_str(MISSING_MARKER);
        }
        output.push('\n');
        if row.breakpoint {
            output.push_str(&format!("{:>6}{}\n", "", BREAKPOINT_MARKER));
        }
    }
    output
}

/// `[{"status":"down","id":"20150704160200","name":"CreateNumbersTable"},...]`
pub fn render_json(rows: &[StatusRow]) -> MigrationResult<String> {
    let items: Vec<JsonStatusRow> = rows.iter().map(JsonStatusRow::from).collect();
    Ok(serde_json::to_string(&items)?)
}

/// Parse JSON produced by `render_json`
pub fn parse_json(json: &str) -> MigrationResult<Vec<JsonStatusRow>> {
    Ok(serde_json::from_str(json)?)
}
