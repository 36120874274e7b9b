//! The schema run: wire the engine, execute it and print the report.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use ssm_core::{ApplyReport, RunOutcome, SchemaEngine, StdFileAccess};

use crate::cli::{Cli, RunSettings};

pub async fn execute(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = cli.load_config(&cwd)?;
    let settings = cli.settings(config)?;
    debug!("Run settings: {:?}", settings);

    let RunSettings {
        schema_dir,
        target_dir,
        config,
    } = settings;

    let engine = SchemaEngine::new(Arc::new(StdFileAccess::new())).with_settings(&config);
    info!("Schema directory: {}", schema_dir.display());
    info!("Target directory: {}", target_dir.display());

    let outcome = engine
        .run(&schema_dir, &target_dir)
        .await
        .with_context(|| format!("Schema run failed for {}", schema_dir.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if !cli.quiet {
        print_outcome(&outcome, &schema_dir, &target_dir);
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome, schema_dir: &Path, target_dir: &Path) {
    match outcome {
        RunOutcome::NoSchemaFiles => {
            println!("⚠️  No schema files found in {}", schema_dir.display());
        }
        RunOutcome::NoTargetFiles(_) => {
            println!("📋 Schema files found in {}", schema_dir.display());
            println!("⚠️  No template files found in {}", target_dir.display());
        }
        RunOutcome::NoTargetedSchemas(_) => {
            println!("📋 Schema files found in {}", schema_dir.display());
            println!("   No schema names a target with \"for\", nothing to write");
        }
        RunOutcome::Applied(report) => {
            println!("📋 Schema files found in {}", schema_dir.display());
            print_report(report);
        }
    }
}

fn print_report(report: &ApplyReport) {
    let verb = if report.dry_run { "Would write" } else { "Wrote" };

    for path in &report.written {
        println!("   ✅ {} {}", verb, path.display());
    }
    for path in &report.appended {
        println!("   ➕ {} (appended) {}", verb, path.display());
    }
    for path in &report.unchanged {
        println!("   ⏭️  Up to date {}", path.display());
    }
    for path in &report.missing_region {
        println!("   ⚠️  No schema region in {}", path.display());
    }
    for target in &report.missing_targets {
        println!("   ⚠️  No template for target '{}'", target);
    }

    if !report.wrote_any() {
        println!("   Nothing written");
    }
    println!(
        "   {} targeted schemas, {} template files ({} ms)",
        report.targeted_schemas,
        report.target_files_found,
        report.duration_ms()
    );
}
