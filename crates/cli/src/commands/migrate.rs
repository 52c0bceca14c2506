use elif_migrations::{
    ledger, render, MarkTarget, MigrationResult, Migrations, MigrationsConfig, OutputFormat,
};

/// `--connection` / `--source` selections shared by every migrate command
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub connection: Option<String>,
    pub sources: Vec<String>,
}

/// Build the status report for the selected connection and sources
pub async fn status_output(
    config: &MigrationsConfig,
    selection: &Selection,
    format: OutputFormat,
) -> MigrationResult<String> {
    let url = config.connection_url(selection.connection.as_deref())?;
    let ledger = ledger::connect(url, &config.ledger_table, false).await?;
    let migrations = Migrations::new(
        config.source_reader(),
        config.resolve_sources(&selection.sources),
        ledger.as_ref(),
    );

    let report = migrations.status().await?;
    render(report.rows(), format)
}

pub async fn status(config: &MigrationsConfig, selection: &Selection, format: OutputFormat) -> MigrationResult<()> {
    let output = status_output(config, selection, format).await?;
    match format {
        OutputFormat::Text => print!("{}", output),
        OutputFormat::Json => println!("{}", output),
    }
    Ok(())
}

pub async fn mark_migrated(
    config: &MigrationsConfig,
    selection: &Selection,
    target: MarkTarget,
) -> MigrationResult<Vec<i64>> {
    let url = config.connection_url(selection.connection.as_deref())?;
    let ledger = ledger::connect(url, &config.ledger_table, true).await?;
    let migrations = Migrations::new(
        config.source_reader(),
        config.resolve_sources(&selection.sources),
        ledger.as_ref(),
    );

    let marked = migrations.mark_migrated(target).await?;
    if marked.is_empty() {
        println!("No migrations to mark as migrated");
    }
    for version in &marked {
        println!("Migration {} marked as migrated", version);
    }
    Ok(marked)
}

pub async fn unmark(config: &MigrationsConfig, connection: Option<&str>, version: i64) -> MigrationResult<()> {
    let url = config.connection_url(connection)?;
    let ledger = ledger::connect(url, &config.ledger_table, false).await?;
    let migrations = Migrations::new(config.source_reader(), Vec::new(), ledger.as_ref());

    migrations.unmark(version).await?;
    println!("Migration {} removed from the ledger", version);
    Ok(())
}
