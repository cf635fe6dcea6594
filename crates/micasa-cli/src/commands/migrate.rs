//! Migrate command
//!
//! Usage: micasa migrate [status]

use clap::{Args, Subcommand};
use micasa_core_types::CancellationToken;
use micasa_store::migrations::{ledger_records, pending_versions};
use micasa_store::{default_catalog, MigrationReport, Store};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: Option<MigrateCommand>,
}

#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Show the ledger and any pending versions
    Status,
}

/// Execute migrate command
///
/// Migrations have already been applied by the time this runs; plain
/// `migrate` reports what that run did.
pub fn execute(
    args: MigrateArgs,
    store: &Store,
    report: &MigrationReport,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        None => {
            print_report(report);
            Ok(())
        }
        Some(MigrateCommand::Status) => execute_status(store, cancel),
    }
}

fn print_report(report: &MigrationReport) {
    if report.applied.is_empty() {
        println!("Schema up to date ({} versions)", report.skipped.len());
    } else {
        println!("Applied versions: {}", join_versions(&report.applied));
    }
}

fn execute_status(
    store: &Store,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    for record in ledger_records(store, cancel)? {
        let applied_at = record
            .applied_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let state = if record.succeeded { "ok" } else { "failed" };
        println!("{:>4}  {:<6}  {}", record.version, state, applied_at);
    }

    let pending = pending_versions(store, &default_catalog(), cancel)?;
    if pending.is_empty() {
        println!("Pending: none");
    } else {
        println!("Pending: {}", join_versions(&pending));
    }
    Ok(())
}

fn join_versions(versions: &[u32]) -> String {
    versions
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
