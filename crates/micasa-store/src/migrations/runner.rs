//! Migration runner
//!
//! Applies every catalog unit whose version is not yet marked succeeded in
//! the ledger, in catalog order, stopping at the first failure.
//!
//! Assumes a single runner: there is no cross-process lock, so run it once at
//! startup before any repository traffic.

use std::time::Instant;

use micasa_core::{log_op_end, log_op_error, log_op_start};
use micasa_core_types::CancellationToken;
use rusqlite::Connection;

use super::catalog::{Catalog, MigrationUnit};
use super::ledger::{ensure_ledger, get_record, record_outcome};
use crate::db::Store;
use crate::errors::{cancelled, from_rusqlite, migration_error, Result};

const OP: &str = "apply_migrations";

/// What a successful run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions executed by this run
    pub applied: Vec<u32>,
    /// Versions already marked succeeded and left alone
    pub skipped: Vec<u32>,
}

/// Apply all pending migrations of `catalog` to the store
///
/// # Errors
///
/// - `Migration` with version and statement index if a statement fails
///   (later versions are not attempted)
/// - `Migration` if the ledger table cannot be created
/// - `Cancelled` if `cancel` fires
pub fn apply_migrations(
    store: &Store,
    catalog: &Catalog,
    cancel: &CancellationToken,
) -> Result<MigrationReport> {
    let started = Instant::now();
    log_op_start!(OP, catalog_len = catalog.len() as u64);

    let result = store.with_connection(OP, cancel, |conn| run_catalog(conn, catalog, cancel));

    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(report) => log_op_end!(
            OP,
            duration_ms = duration_ms,
            applied = report.applied.len() as u64,
            skipped = report.skipped.len() as u64
        ),
        Err(err) => log_op_error!(OP, err, duration_ms = duration_ms),
    }
    result
}

/// Catalog versions that are not yet marked succeeded
///
/// # Errors
///
/// `Migration` if the ledger cannot be created, `Persistence` on read failure.
pub fn pending_versions(
    store: &Store,
    catalog: &Catalog,
    cancel: &CancellationToken,
) -> Result<Vec<u32>> {
    store.with_connection("pending_versions", cancel, |conn| {
        ensure_ledger(conn)?;
        let mut pending = Vec::new();
        for unit in catalog.units() {
            if !is_succeeded(conn, unit.version())? {
                pending.push(unit.version());
            }
        }
        Ok(pending)
    })
}

fn is_succeeded(conn: &Connection, version: u32) -> Result<bool> {
    Ok(get_record(conn, version)?
        .map(|record| record.succeeded)
        .unwrap_or(false))
}

fn run_catalog(
    conn: &mut Connection,
    catalog: &Catalog,
    cancel: &CancellationToken,
) -> Result<MigrationReport> {
    ensure_ledger(conn)?;

    let mut report = MigrationReport::default();
    for unit in catalog.units() {
        if is_succeeded(conn, unit.version())? {
            tracing::debug!(migration_version = unit.version(), "migration already applied");
            report.skipped.push(unit.version());
            continue;
        }
        if cancel.is_cancelled() {
            return Err(cancelled(OP).with_version(unit.version()));
        }
        apply_unit(conn, unit)?;
        report.applied.push(unit.version());
    }

    Ok(report)
}

/// Run one unit; on failure record the attempt as unsucceeded
fn apply_unit(conn: &mut Connection, unit: &MigrationUnit) -> Result<()> {
    tracing::info!(
        migration_version = unit.version(),
        statements = unit.statements().len() as u64,
        "executing DB migration"
    );

    let err = match execute_unit(conn, unit) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    // The ledger write must go through even if the failure was a cancellation
    conn.progress_handler(0, None::<fn() -> bool>);
    if let Err(ledger_err) = record_outcome(conn, unit.version(), false) {
        tracing::warn!(
            migration_version = unit.version(),
            err.code = ledger_err.code(),
            "failed to record migration failure in ledger"
        );
    }
    Err(err)
}

/// Execute a unit's statements and mark it succeeded, all in one transaction
fn execute_unit(conn: &mut Connection, unit: &MigrationUnit) -> Result<()> {
    let version = unit.version();
    let total = unit.statements().len();
    let tx = conn.transaction().map_err(|e| from_rusqlite(OP, e))?;

    for (index, statement) in unit.statements().iter().enumerate() {
        tracing::debug!(
            migration_version = version,
            statement = index as u64,
            "query {} of {}",
            index + 1,
            total
        );
        tx.execute_batch(statement)
            .map_err(|e| migration_error(version, index, e))?;
    }

    record_outcome(&tx, version, true)?;
    tx.commit().map_err(|e| from_rusqlite(OP, e))?;
    Ok(())
}
