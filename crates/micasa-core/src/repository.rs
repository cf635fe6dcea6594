//! Repository interfaces
//!
//! Implementations live in `micasa-store`. Every operation takes a
//! `CancellationToken`; a fired token makes the call return
//! `ExErrorKind::Cancelled`.

use micasa_core_types::CancellationToken;

use crate::errors::Result;
use crate::model::{User, UserId};

/// Stores, queries for and authenticates users
pub trait UserRepository {
    /// Create a new user
    ///
    /// Assigns a fresh id (any id already on `user` is ignored) and lowercases
    /// the name. On success `user` reflects the stored row.
    ///
    /// # Errors
    ///
    /// `Duplicate` if the name is taken, `Persistence` for other store failures.
    fn create(&self, user: &mut User, cancel: &CancellationToken) -> Result<()>;

    /// Overwrite name, full name and password hash of an existing user
    ///
    /// # Errors
    ///
    /// `NotFound` if `user.id` does not exist, `Duplicate` on a name collision.
    fn update(&self, user: &mut User, cancel: &CancellationToken) -> Result<()>;

    /// Remove a user; removing an unknown id is a no-op
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    fn delete(&self, id: &UserId, cancel: &CancellationToken) -> Result<()>;

    /// Check whether a user with this id exists
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure; absence is `Ok(false)`.
    fn exists(&self, id: &UserId, cancel: &CancellationToken) -> Result<bool>;

    /// Load a user by id
    ///
    /// # Errors
    ///
    /// `NotFound` if no such user exists.
    fn get_by_id(&self, id: &UserId, cancel: &CancellationToken) -> Result<User>;

    /// Load the user with this login name and password (login)
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` for an unknown name and for a wrong password
    /// alike.
    fn get_by_credentials(
        &self,
        name: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<User>;

    /// Case-insensitive substring search over name and full name, ordered by
    /// name, paginated by `offset`/`limit`
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure; no match is an empty vec.
    fn find(
        &self,
        search: &str,
        offset: u32,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<User>>;

    /// Total number of users
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure.
    fn count(&self, cancel: &CancellationToken) -> Result<u64>;
}
