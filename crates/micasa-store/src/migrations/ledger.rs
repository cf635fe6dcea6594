//! Migration ledger
//!
//! One row per catalog version ever attempted. Rows are upserted, never
//! deleted.

use chrono::{DateTime, Utc};
use micasa_core::errors::{ExError, ExErrorKind};
use micasa_core_types::CancellationToken;
use rusqlite::{Connection, OptionalExtension};

use crate::db::Store;
use crate::errors::{from_rusqlite, Result};

/// Name of the ledger table
pub const LEDGER_TABLE: &str = "Migrations";

/// Ledger state of one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub version: u32,
    pub succeeded: bool,
    /// When the version last succeeded; `None` while unsucceeded
    pub applied_at: Option<DateTime<Utc>>,
}

/// Create the ledger table if it doesn't exist
pub(crate) fn ensure_ledger(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS Migrations (
            version     INTEGER NOT NULL,
            succeeded   INTEGER NOT NULL DEFAULT 0,
            applied_at  INTEGER,
            PRIMARY KEY(version)
        )",
    )
    .map_err(|e| {
        ExError::new(ExErrorKind::Migration)
            .with_op("ensure_ledger")
            .with_message(format!("Failed to create migrations table: {}", e))
            .with_source(e)
    })
}

/// Look up the record for one version; no row is `None`
pub(crate) fn get_record(conn: &Connection, version: u32) -> Result<Option<MigrationRecord>> {
    conn.query_row(
        "SELECT version, succeeded, applied_at FROM Migrations WHERE version = ?1",
        [version],
        row_to_record,
    )
    .optional()
    .map_err(|e| from_rusqlite("read_ledger", e))
}

/// Upsert the outcome of an attempt
pub(crate) fn record_outcome(conn: &Connection, version: u32, succeeded: bool) -> Result<()> {
    conn.execute(
        "INSERT INTO Migrations (version, succeeded, applied_at)
         VALUES (?1, ?2, CASE WHEN ?2 THEN CAST(strftime('%s', 'now') AS INTEGER) ELSE NULL END)
         ON CONFLICT(version) DO UPDATE SET
            succeeded = excluded.succeeded,
            applied_at = excluded.applied_at",
        rusqlite::params![version, succeeded],
    )
    .map_err(|e| from_rusqlite("write_ledger", e))?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MigrationRecord> {
    let applied_at = match row.get::<_, Option<i64>>(2)? {
        Some(secs) => Some(DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Integer,
                format!("applied_at {} out of range", secs).into(),
            )
        })?),
        None => None,
    };
    Ok(MigrationRecord {
        version: row.get(0)?,
        succeeded: row.get(1)?,
        applied_at,
    })
}

/// All ledger rows, ordered by version
///
/// Creates the ledger table first if it is missing.
///
/// # Errors
///
/// `Migration` if the ledger cannot be created, `Persistence` on read failure.
pub fn ledger_records(store: &Store, cancel: &CancellationToken) -> Result<Vec<MigrationRecord>> {
    store.with_connection("ledger_records", cancel, |conn| {
        ensure_ledger(conn)?;
        let mut stmt = conn
            .prepare("SELECT version, succeeded, applied_at FROM Migrations ORDER BY version")
            .map_err(|e| from_rusqlite("ledger_records", e))?;
        let records = stmt
            .query_map([], row_to_record)
            .map_err(|e| from_rusqlite("ledger_records", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| from_rusqlite("ledger_records", e))?;
        Ok(records)
    })
}
