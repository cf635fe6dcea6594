//! SQLite user repository
//!
//! Implements `UserRepository` over the shared `Store`. Names are normalized
//! here before every write and lookup; uniqueness itself is enforced by the
//! schema and surfaces as `Duplicate` through the error boundary.

use std::time::Instant;

use chrono::{DateTime, Utc};
use micasa_core::errors::CredentialError;
use micasa_core::{
    log_op_end, log_op_error, log_op_start, normalize_name, CredentialHasher, User, UserId,
    UserRepository,
};
use micasa_core_types::CancellationToken;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use crate::db::{Store, FOLD_CASE_FN};
use crate::errors::{authentication_failed, from_rusqlite, user_not_found, Result};

const USER_COLUMNS: &str = "userid, name, passwordHash, fullName, createdAt, updatedAt";

/// Plaintext behind the dummy hash verified for unknown login names
const DUMMY_PASSWORD: &str = "micasa-dummy-credential";

/// SQLite-backed user repository
#[derive(Clone)]
pub struct SqliteUserRepo {
    store: Store,
    hasher: CredentialHasher,
    /// Hash verified for unknown login names; `None` if hashing failed
    dummy_hash: Option<String>,
}

impl SqliteUserRepo {
    /// Create a repository using the current hash parameters
    pub fn new(store: Store) -> Self {
        Self::with_hasher(store, CredentialHasher::default())
    }

    /// Create a repository whose login path hashes with `hasher`
    ///
    /// Only the dummy hash for unknown names depends on it; stored hashes
    /// are always verified with the parameters embedded in them. The dummy
    /// hash is built here so no login pays for it.
    pub fn with_hasher(store: Store, hasher: CredentialHasher) -> Self {
        let dummy_hash = match hasher.hash(DUMMY_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(err) => {
                tracing::warn!(error = %err, "failed to build dummy credential hash");
                None
            }
        };
        Self {
            store,
            hasher,
            dummy_hash,
        }
    }

    /// Get the underlying store handle
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Burn one verification so an unknown name costs about as much as a
    /// wrong password
    fn verify_dummy(&self, password: &str) {
        match &self.dummy_hash {
            Some(hash) => {
                let _ = self.hasher.verify(hash, password);
            }
            // Hashing costs the same Argon2 work as verifying
            None => {
                let _ = self.hasher.hash(password);
            }
        }
    }
}

fn finish<T>(op: &str, started: Instant, result: Result<T>) -> Result<T> {
    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => log_op_end!(op, duration_ms = duration_ms),
        Err(err) => log_op_error!(op, err, duration_ms = duration_ms),
    }
    result
}

/// Read an epoch-seconds column; out-of-range values are a conversion error
fn timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp {} out of range", secs).into(),
        )
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    Ok(User {
        id: UserId::new(id),
        name: row.get(1)?,
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        created_at: timestamp(row, 4)?,
        updated_at: timestamp(row, 5)?,
    })
}

fn select_by_id(conn: &Connection, op: &str, id: &UserId) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM Users WHERE userid = ?1", USER_COLUMNS),
        [id.as_str()],
        row_to_user,
    )
    .optional()
    .map_err(|e| from_rusqlite(op, e))
}

/// Escape LIKE metacharacters so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl UserRepository for SqliteUserRepo {
    fn create(&self, user: &mut User, cancel: &CancellationToken) -> micasa_core::Result<()> {
        const OP: &str = "create_user";
        let started = Instant::now();

        let id = UserId::generate();
        let name = normalize_name(&user.name);
        log_op_start!(OP, user_id = %id, user_name = %name);

        let result = self.store.with_connection(OP, cancel, |conn| {
            conn.execute(
                "INSERT INTO Users (userid, name, passwordHash, fullName) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.as_str(), name, user.password_hash, user.full_name],
            )
            .map_err(|e| from_rusqlite(OP, e).with_entity_id(name.as_str()))?;

            select_by_id(conn, OP, &id)?.ok_or_else(|| user_not_found(OP, id.as_str()))
        });

        finish(OP, started, result).map(|stored| *user = stored)
    }

    fn update(&self, user: &mut User, cancel: &CancellationToken) -> micasa_core::Result<()> {
        const OP: &str = "update_user";
        let started = Instant::now();

        let name = normalize_name(&user.name);
        log_op_start!(OP, user_id = %user.id, user_name = %name);

        let result = self.store.with_connection(OP, cancel, |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| from_rusqlite(OP, e))?;

            let found: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM Users WHERE userid = ?1)",
                    [user.id.as_str()],
                    |row| row.get(0),
                )
                .map_err(|e| from_rusqlite(OP, e))?;
            if !found {
                return Err(user_not_found(OP, user.id.as_str()));
            }

            tx.execute(
                "UPDATE Users
                 SET name = ?2, fullName = ?3, passwordHash = ?4,
                     updatedAt = CAST(strftime('%s', 'now') AS INTEGER)
                 WHERE userid = ?1",
                rusqlite::params![user.id.as_str(), name, user.full_name, user.password_hash],
            )
            .map_err(|e| from_rusqlite(OP, e).with_entity_id(user.id.as_str()))?;

            let stored = select_by_id(&tx, OP, &user.id)?
                .ok_or_else(|| user_not_found(OP, user.id.as_str()))?;
            tx.commit().map_err(|e| from_rusqlite(OP, e))?;
            Ok(stored)
        });

        finish(OP, started, result).map(|stored| *user = stored)
    }

    fn delete(&self, id: &UserId, cancel: &CancellationToken) -> micasa_core::Result<()> {
        const OP: &str = "delete_user";
        let started = Instant::now();
        log_op_start!(OP, user_id = %id);

        let result = self.store.with_connection(OP, cancel, |conn| {
            let removed = conn
                .execute("DELETE FROM Users WHERE userid = ?1", [id.as_str()])
                .map_err(|e| from_rusqlite(OP, e))?;
            if removed == 0 {
                tracing::debug!(user_id = %id, "delete of absent user is a no-op");
            }
            Ok(())
        });

        finish(OP, started, result)
    }

    fn exists(&self, id: &UserId, cancel: &CancellationToken) -> micasa_core::Result<bool> {
        const OP: &str = "user_exists";
        self.store.with_connection(OP, cancel, |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM Users WHERE userid = ?1)",
                [id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| from_rusqlite(OP, e))
        })
    }

    fn get_by_id(&self, id: &UserId, cancel: &CancellationToken) -> micasa_core::Result<User> {
        const OP: &str = "get_user";
        let started = Instant::now();
        log_op_start!(OP, user_id = %id);

        let result = self.store.with_connection(OP, cancel, |conn| {
            select_by_id(conn, OP, id)?.ok_or_else(|| user_not_found(OP, id.as_str()))
        });

        finish(OP, started, result)
    }

    fn get_by_credentials(
        &self,
        name: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> micasa_core::Result<User> {
        const OP: &str = "login_user";
        let started = Instant::now();

        let name = normalize_name(name);
        log_op_start!(OP, user_name = %name);

        let lookup = self.store.with_connection(OP, cancel, |conn| {
            conn.query_row(
                &format!("SELECT {} FROM Users WHERE name = ?1", USER_COLUMNS),
                [name.as_str()],
                row_to_user,
            )
            .optional()
            .map_err(|e| from_rusqlite(OP, e))
        });

        // Hash verification runs without holding the connection
        let result = lookup.and_then(|found| match found {
            None => {
                self.verify_dummy(password);
                tracing::warn!(user_name = %name, reason = "unknown_user", "login rejected");
                Err(authentication_failed(OP))
            }
            Some(user) => match self.hasher.verify(&user.password_hash, password) {
                Ok(()) => Ok(user),
                Err(err) => {
                    let reason = match err {
                        CredentialError::Mismatch => "wrong_password",
                        _ => "malformed_hash",
                    };
                    tracing::warn!(user_id = %user.id, reason, "login rejected");
                    Err(authentication_failed(OP))
                }
            },
        });

        finish(OP, started, result)
    }

    fn find(
        &self,
        search: &str,
        offset: u32,
        limit: u32,
        cancel: &CancellationToken,
    ) -> micasa_core::Result<Vec<User>> {
        const OP: &str = "find_users";
        let started = Instant::now();
        log_op_start!(OP, offset = offset as u64, limit = limit as u64);

        let pattern = format!("%{}%", escape_like(&normalize_name(search)));
        let result = self.store.with_connection(OP, cancel, |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {cols} FROM Users
                     WHERE {fold}(name) LIKE ?1 ESCAPE '\\'
                        OR {fold}(fullName) LIKE ?1 ESCAPE '\\'
                     ORDER BY name, userid
                     LIMIT ?2 OFFSET ?3",
                    cols = USER_COLUMNS,
                    fold = FOLD_CASE_FN
                ))
                .map_err(|e| from_rusqlite(OP, e))?;

            let users = stmt
                .query_map(
                    rusqlite::params![pattern, i64::from(limit), i64::from(offset)],
                    row_to_user,
                )
                .map_err(|e| from_rusqlite(OP, e))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| from_rusqlite(OP, e))?;
            Ok(users)
        });

        finish(OP, started, result)
    }

    fn count(&self, cancel: &CancellationToken) -> micasa_core::Result<u64> {
        const OP: &str = "count_users";
        self.store.with_connection(OP, cancel, |conn| {
            let n: i64 = conn
                .query_row("SELECT COUNT(*) FROM Users", [], |row| row.get(0))
                .map_err(|e| from_rusqlite(OP, e))?;
            Ok(n.max(0) as u64)
        })
    }
}
