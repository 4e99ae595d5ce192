//! The `migrate` command: list, preview and apply named migrations.

use bookshift_migrate::{Migration, available_migrations};
use bookshift_parse::RecordStore;
use miette::Result;
use tracing::info;

use crate::config::Config;

/// What the user asked the migrate command to do.
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub migration: Option<String>,
    pub list: bool,
    pub dry_run: bool,
    pub all: bool,
    pub rewrite_base_url: bool,
}

/// Run the migrate command with the given options.
pub async fn run_migrate_command(
    store: &dyn RecordStore,
    config: &Config,
    options: &MigrateOptions,
) -> Result<()> {
    let migrations = available_migrations(
        &config.old_uploader_id,
        &config.new_uploader_id,
        options.rewrite_base_url,
    );

    if options.list {
        println!("Available migrations:\n");
        for m in &migrations {
            let needs = m
                .needs_migration(store, &config.master_key)
                .await
                .map_err(|e| miette::miette!("{}", e))?;
            let status = if needs { "[PENDING]" } else { "[APPLIED]" };
            println!("  {} {}", status, m.name());
            println!("      {}\n", m.description());
        }
        return Ok(());
    }

    let to_run = select_migrations(store, config, migrations, options).await?;

    if to_run.is_empty() {
        println!("No pending migrations to run.");
        return Ok(());
    }

    for m in to_run {
        println!("\n=== {} ===", m.name());
        println!("{}\n", m.description());

        if options.dry_run {
            let preview = m
                .preview(store, &config.master_key)
                .await
                .map_err(|e| miette::miette!("{}", e))?;
            println!(
                "Dry-run: {} record(s) would be updated",
                preview.records_to_update
            );
            if !preview.changes.is_empty() {
                println!("\nChanges:");
                for change in &preview.changes {
                    println!("  - {}", change);
                }
            }
        } else {
            let result = m
                .apply(store, &config.master_key)
                .await
                .map_err(|e| miette::miette!("{}", e))?;
            info!(
                migration = m.name(),
                records = result.records_processed,
                "migration applied"
            );
            println!("Applied: {} record(s) processed", result.records_processed);
            if result.base_urls_rewritten > 0 || result.base_urls_unmatched > 0 {
                println!(
                    "  baseUrl: {} rewritten, {} left unchanged",
                    result.base_urls_rewritten, result.base_urls_unmatched
                );
            }
        }
    }

    Ok(())
}

async fn select_migrations(
    store: &dyn RecordStore,
    config: &Config,
    migrations: Vec<Box<dyn Migration>>,
    options: &MigrateOptions,
) -> Result<Vec<Box<dyn Migration>>> {
    if options.all {
        // Run all pending migrations
        let mut pending = Vec::new();
        for m in migrations {
            if m.needs_migration(store, &config.master_key)
                .await
                .map_err(|e| miette::miette!("{}", e))?
            {
                pending.push(m);
            }
        }
        Ok(pending)
    } else if let Some(name) = options.migration.as_deref() {
        let m = migrations
            .into_iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| miette::miette!("Unknown migration: {}", name))?;
        Ok(vec![m])
    } else {
        Err(miette::miette!(
            "Specify a migration name, --all, or --list"
        ))
    }
}
