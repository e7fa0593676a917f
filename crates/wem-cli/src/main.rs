//! `wem` — workspace element migration CLI
//!
//! Two subcommands: `export` snapshots the source workspace to a directory
//! package, `import` reconciles the destination workspace from one.
//! Credentials come from the environment (`.env` supported); the process
//! exits non-zero on any fatal error.

use std::sync::Arc;

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use owo_colors::OwoColorize;
use wem_api::{ConfigSide, HttpPlatformApi, WorkspaceConfig};
use wem_engine::{ExportOptions, Migrator};
use wem_snapshot::SnapshotStore;

const DEFAULT_SNAPSHOT_DIR: &str = "./dist";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may be set directly.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Command::new("wem")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Migrate workspace elements between platform instances")
        .subcommand_required(true)
        .subcommand(
            Command::new("export")
                .about("Export a workspace as a snapshot package")
                .arg(
                    Arg::new("outputPath")
                        .help("Snapshot root directory")
                        .default_value(DEFAULT_SNAPSHOT_DIR),
                )
                .arg(
                    Arg::new("all-connectors")
                        .long("all-connectors")
                        .action(ArgAction::SetTrue)
                        .help("Export every connector, not only those referenced by an integration"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Reconcile a workspace from a snapshot package")
                .arg(
                    Arg::new("inputPath")
                        .help("Snapshot root directory")
                        .default_value(DEFAULT_SNAPSHOT_DIR),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("export", args)) => {
            let output = args
                .get_one::<String>("outputPath")
                .map(String::as_str)
                .unwrap_or(DEFAULT_SNAPSHOT_DIR);
            let options = ExportOptions {
                all_connectors: args.get_flag("all-connectors"),
            };
            export(output, options).await
        }
        Some(("import", args)) => {
            let input = args
                .get_one::<String>("inputPath")
                .map(String::as_str)
                .unwrap_or(DEFAULT_SNAPSHOT_DIR);
            import(input).await
        }
        _ => Ok(()),
    }
}

async fn export(output: &str, options: ExportOptions) -> anyhow::Result<()> {
    let config = WorkspaceConfig::from_env(ConfigSide::Export)?;
    let api = Arc::new(HttpPlatformApi::new(&config)?);
    let store = SnapshotStore::new(output);

    let snapshot = Migrator::new(api)
        .export(&store, options)
        .await
        .context("export failed")?;

    println!(
        "{}",
        format!(
            "Exported {} elements and {} connectors to {}",
            snapshot.element_count(),
            snapshot.connectors.len(),
            store.root().display()
        )
        .green()
    );
    Ok(())
}

async fn import(input: &str) -> anyhow::Result<()> {
    let config = WorkspaceConfig::from_env(ConfigSide::Import)?;
    let api = Arc::new(HttpPlatformApi::new(&config)?);
    let store = SnapshotStore::new(input);

    let mut migrator = Migrator::new(api);
    if let Some(workspace_id) = &config.workspace_id {
        migrator = migrator.with_workspace_id(workspace_id);
    }

    let report = migrator.import(&store).await.context("import failed")?;

    // Warnings were buffered for the whole run; show them as one group.
    let warnings = report.warnings();
    if !warnings.is_empty() {
        println!("{}", format!("Warnings ({}):", warnings.len()).yellow().bold());
        for warning in &warnings {
            println!(
                "{}",
                format!("  [{}] {}", warning.subject, warning.message).yellow()
            );
        }
    }

    let counts = report.counts();
    println!(
        "{}",
        format!(
            "Import complete: created {}, updated {}, reset {}, applied {}, customized {}, skipped {}",
            counts.created,
            counts.updated,
            counts.reset,
            counts.applied,
            counts.customized,
            counts.skipped,
        )
        .green()
    );
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
