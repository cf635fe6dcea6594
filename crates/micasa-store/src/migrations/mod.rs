//! Migration framework
//!
//! Provides:
//! - `Catalog`: an explicit, validated, ordered list of migration units
//! - The engine (`apply_migrations`) with a per-version success ledger
//! - The application's own catalog (`default_catalog`)

mod catalog;
mod embedded;
mod ledger;
mod runner;

pub use catalog::{Catalog, MigrationUnit};
pub use embedded::default_catalog;
pub use ledger::{ledger_records, MigrationRecord, LEDGER_TABLE};
pub use runner::{apply_migrations, pending_versions, MigrationReport};
