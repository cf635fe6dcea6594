//! MiCasa Store - SQLite persistence
//!
//! Provides:
//! - The shared `Store` connection handle with cancellation support
//! - The migration engine, its ledger and the application catalog
//! - `SqliteUserRepo`, the `UserRepository` implementation
//! - The storage error boundary (`rusqlite::Error` → `ExError`)

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use db::{Store, StoreConfig};
pub use errors::Result;
pub use migrations::{apply_migrations, default_catalog, Catalog, MigrationReport, MigrationUnit};
pub use repo::SqliteUserRepo;
