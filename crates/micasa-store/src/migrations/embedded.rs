//! The application schema
//!
//! Statements must be safe to re-run from the top of their unit: a failed
//! version is retried from its first statement on the next start.

use super::catalog::{Catalog, MigrationUnit};

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS Users (
    userid        VARCHAR(32)  NOT NULL,
    name          VARCHAR(64)  NOT NULL UNIQUE,
    passwordHash  VARCHAR(128) NOT NULL DEFAULT '',
    fullName      VARCHAR(128) NOT NULL DEFAULT '',
    createdAt     INTEGER      NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
    updatedAt     INTEGER      NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
    PRIMARY KEY(userid)
)";

const CREATE_USERS_NAME_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS Users_name_lower ON Users(lower(name))";

const CREATE_USERS_FULLNAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS Users_fullName_lower ON Users(lower(fullName))";

/// Get the application's migration catalog
pub fn default_catalog() -> Catalog {
    Catalog::from_ordered(vec![
        MigrationUnit::new(1, [CREATE_USERS]),
        MigrationUnit::new(2, [CREATE_USERS_NAME_INDEX]),
        MigrationUnit::new(3, [CREATE_USERS_FULLNAME_INDEX]),
    ])
}
