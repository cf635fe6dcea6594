//! Database connection management
//!
//! `Store` is the shared handle to the one SQLite connection a process owns.
//! It is cheap to clone; the migration engine and the repositories each hold
//! a clone and keep no other state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use micasa_core::normalize_name;
use micasa_core_types::CancellationToken;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::errors::{cancelled, from_rusqlite, poisoned, Result};

/// Number of SQLite VM instructions between cancellation checks
const PROGRESS_OPS: i32 = 1_000;

/// SQL name of the Unicode case-folding function
///
/// SQLite's own `lower()` and `LIKE` only fold ASCII.
pub const FOLD_CASE_FN: &str = "fold_case";

/// Where and how to open the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database file; `None` opens a private in-memory database
    pub path: Option<PathBuf>,
    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Use write-ahead logging (file databases only)
    pub wal: bool,
}

impl StoreConfig {
    /// Configuration for a database file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Configuration for an in-memory database
    pub fn in_memory() -> Self {
        Self::default()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout: Duration::from_secs(5),
            wal: true,
        }
    }
}

/// Shared handle to an open SQLite store
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if needed) the store described by `config`
    ///
    /// # Errors
    ///
    /// `Persistence` if the database cannot be opened or configured.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = match &config.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(|e| from_rusqlite("open_store", e))?;

        configure(&conn, config)?;
        tracing::debug!(
            path = ?config.path,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "store opened"
        );
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory store (for testing)
    ///
    /// # Errors
    ///
    /// `Persistence` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    /// Wrap an already configured connection
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` with exclusive access to the connection
    ///
    /// Fails with `Cancelled` without touching the store if `cancel` has
    /// already fired. While `f` runs, a progress handler interrupts the
    /// in-flight statement as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// `Cancelled`, `Internal` for a poisoned lock, or whatever `f` returns.
    pub fn with_connection<T, F>(&self, op: &str, cancel: &CancellationToken, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        if cancel.is_cancelled() {
            return Err(cancelled(op));
        }
        let mut conn = self.conn.lock().map_err(|_| poisoned(op))?;
        // Waiting for the lock may have used up the deadline
        if cancel.is_cancelled() {
            return Err(cancelled(op));
        }

        let token = cancel.clone();
        conn.progress_handler(PROGRESS_OPS, Some(move || token.is_cancelled()));
        let result = f(&mut *conn);
        conn.progress_handler(0, None::<fn() -> bool>);
        result
    }
}

/// Configure a connection with the store settings
fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| from_rusqlite("configure_store", e))?;

    conn.execute_batch("PRAGMA foreign_keys = ON")
        .map_err(|e| from_rusqlite("configure_store", e))?;

    register_fold_case(conn).map_err(|e| from_rusqlite("configure_store", e))?;

    // journal_mode answers with the resulting mode
    if config.wal && config.path.is_some() {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| from_rusqlite("configure_store", e))?;
        tracing::debug!(journal_mode = %mode, "journal mode set");
    }

    Ok(())
}

/// Register `fold_case(text)`, folding exactly like `normalize_name`
fn register_fold_case(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| normalize_name(&t)))
        },
    )
}
