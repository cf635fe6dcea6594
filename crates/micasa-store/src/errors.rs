//! Error handling for micasa-store
//!
//! This is the storage boundary: every `rusqlite::Error` is classified into
//! an `ExErrorKind` here, once, from SQLite's result codes. Nothing above
//! this module sees rusqlite types or inspects error text.

use micasa_core::errors::{ExError, ExErrorKind};
use rusqlite::{ffi, ErrorCode};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Classify a native SQLite error
pub fn classify(err: &rusqlite::Error) -> ExErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
        {
            ExErrorKind::Duplicate
        }
        // Only our progress handler interrupts statements
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::OperationInterrupted => {
            ExErrorKind::Cancelled
        }
        _ => ExErrorKind::Persistence,
    }
}

/// Create a classified error from rusqlite::Error, keeping it as the source
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> ExError {
    let kind = classify(&err);
    let message = match kind {
        ExErrorKind::Duplicate => "Duplicate record".to_string(),
        ExErrorKind::Cancelled => "Operation cancelled".to_string(),
        _ => err.to_string(),
    };
    ExError::new(kind)
        .with_op(op)
        .with_message(message)
        .with_source(err)
}

/// Create a migration error for a failing statement
///
/// An interrupted statement stays `Cancelled`; anything else becomes
/// `Migration` with the version and statement position attached.
pub fn migration_error(version: u32, statement_index: usize, err: rusqlite::Error) -> ExError {
    if classify(&err) == ExErrorKind::Cancelled {
        return from_rusqlite("apply_migrations", err).with_version(version);
    }
    ExError::new(ExErrorKind::Migration)
        .with_op("apply_migrations")
        .with_version(version)
        .with_statement_index(statement_index)
        .with_message(format!(
            "Migration {} failed at statement {}: {}",
            version, statement_index, err
        ))
        .with_source(err)
}

/// Create a cancellation error for an operation that never reached the store
pub fn cancelled(op: &str) -> ExError {
    ExError::new(ExErrorKind::Cancelled)
        .with_op(op)
        .with_message("Operation cancelled")
}

/// Create a not-found error for a user id
pub fn user_not_found(op: &str, id: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op)
        .with_entity_id(id)
        .with_message("Record does not exist")
}

/// Create the single externally visible login failure
pub fn authentication_failed(op: &str) -> ExError {
    ExError::new(ExErrorKind::AuthenticationFailed)
        .with_op(op)
        .with_message("Authentication failed")
}

/// Create an error for a connection mutex poisoned by a panicking holder
pub fn poisoned(op: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op)
        .with_message("Store connection lock poisoned")
}
