use elif_migrations::{
    render, render::parse_json, MarkTarget, Migrations, MigrationState, OutputFormat, SourceReader,
    SqliteLedger,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MIGRATION_FILES: [&str; 3] = [
    "20150704160200_create_numbers_table.sql",
    "20150724233100_update_numbers_table.sql",
    "20150826191400_create_letters_table.sql",
];

/// A source root holding the three test migrations
fn tests_migrations() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for name in MIGRATION_FILES {
        fs::write(temp_dir.path().join(name), "-- Up migration\n-- Down migration\n").unwrap();
    }
    fs::write(temp_dir.path().join("schema-dump-default.lock"), "").unwrap();
    temp_dir
}

/// The setup step and the status query must share one session
async fn shared_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

async fn display(root: &Path, ledger: &SqliteLedger, format: OutputFormat) -> String {
    let migrations = Migrations::new(SourceReader::new(), vec![root.to_path_buf()], ledger);
    let report = migrations.status().await.unwrap();
    render(report.rows(), format).unwrap()
}

#[tokio::test]
async fn test_execute() {
    let root = tests_migrations();
    let ledger = SqliteLedger::new(shared_pool().await, "phinxlog");

    let display = display(root.path(), &ledger, OutputFormat::Text).await;

    assert!(display.contains("down  20150704160200  CreateNumbersTable"));
    assert!(display.contains("down  20150724233100  UpdateNumbersTable"));
    assert!(display.contains("down  20150826191400  CreateLettersTable"));
    assert_eq!(display.lines().count(), 3);
}

#[tokio::test]
async fn test_execute_json() {
    let root = tests_migrations();
    let ledger = SqliteLedger::new(shared_pool().await, "phinxlog");

    let display = display(root.path(), &ledger, OutputFormat::Json).await;

    let expected = "{\"status\":\"down\",\"id\":\"20150704160200\",\"name\":\"CreateNumbersTable\"},\
                    {\"status\":\"down\",\"id\":\"20150724233100\",\"name\":\"UpdateNumbersTable\"},\
                    {\"status\":\"down\",\"id\":\"20150826191400\",\"name\":\"CreateLettersTable\"}";
    assert!(display.contains(expected));

    let parsed = parse_json(&display).unwrap();
    assert!(parsed.iter().all(|row| row.status == MigrationState::Down));
}

#[tokio::test]
async fn test_execute_with_migrated() {
    let root = tests_migrations();
    let ledger = SqliteLedger::new(shared_pool().await, "phinxlog");
    let migrations = Migrations::new(SourceReader::new(), vec![root.path().to_path_buf()], &ledger);
    migrations.mark_migrated(MarkTarget::All).await.unwrap();

    let display = display(root.path(), &ledger, OutputFormat::Text).await;

    assert!(display.contains("up  20150704160200  CreateNumbersTable"));
    assert!(display.contains("up  20150724233100  UpdateNumbersTable"));
    assert!(display.contains("up  20150826191400  CreateLettersTable"));
    assert!(!display.contains("** MISSING **"));
}

#[tokio::test]
async fn test_execute_with_inconsistency() {
    let root = tests_migrations();
    let ledger = SqliteLedger::new(shared_pool().await, "phinxlog");
    let migrations = Migrations::new(SourceReader::new(), vec![root.path().to_path_buf()], &ledger);
    migrations.mark_migrated(MarkTarget::All).await.unwrap();

    fs::rename(
        root.path().join("20150724233100_update_numbers_table.sql"),
        root.path().join("_20150724233100_update_numbers_table.sql"),
    )
    .unwrap();

    let display = display(root.path(), &ledger, OutputFormat::Text).await;

    assert!(display.contains("up  20150704160200  CreateNumbersTable\n"));
    assert!(display.contains("up  20150724233100  UpdateNumbersTable  ** MISSING **"));
    assert!(display.contains("up  20150826191400  CreateLettersTable\n"));
}

#[tokio::test]
async fn test_rollback_after_status_leaves_everything_down() {
    let root = tests_migrations();
    let ledger = SqliteLedger::new(shared_pool().await, "phinxlog");
    let migrations = Migrations::new(SourceReader::new(), vec![root.path().to_path_buf()], &ledger);
    migrations.mark_migrated(MarkTarget::All).await.unwrap();

    for version in [20150826191400, 20150724233100, 20150704160200] {
        migrations.unmark(version).await.unwrap();
    }

    let report = migrations.status().await.unwrap();
    assert_eq!(report.pending_count(), 3);
    assert_eq!(report.missing_count(), 0);
}
