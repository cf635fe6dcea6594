//! MiCasa Core - domain kernel
//!
//! This crate provides:
//! - The `User` account model and its `UserId`
//! - The Argon2id credential hasher
//! - The canonical error facility (`ExError` / `ExErrorKind`)
//! - The `UserRepository` trait implemented by the persistence layer
//! - The structured logging facility

pub mod credentials;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod repository;

// Used by the logging macros
#[doc(hidden)]
pub use micasa_core_types;

// Re-export commonly used types
pub use credentials::{CredentialHasher, HashParams};
pub use errors::{CredentialError, ExError, ExErrorKind, Result};
pub use model::{normalize_name, User, UserId};
pub use repository::UserRepository;
