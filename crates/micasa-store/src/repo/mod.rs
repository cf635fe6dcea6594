//! Repository implementations over the SQLite store

pub mod user_repo;

pub use user_repo::SqliteUserRepo;
