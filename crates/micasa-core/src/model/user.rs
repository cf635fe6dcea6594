use chrono::{DateTime, Utc};
use micasa_core_types::Sensitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credentials::CredentialHasher;
use crate::errors::CredentialError;

/// Opaque user identifier
///
/// Minted by the repository on create (random UUIDv4, 32 hex chars); never
/// changes afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing identifier (e.g. read from storage or a request)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the placeholder id of a user not yet created
    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Lowercase a login name
///
/// Login names are case-insensitive; every write and every lookup goes
/// through this.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

/// User - an account of the application
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Internal user ID, assigned by the repository
    pub id: UserId,

    /// Login name, stored lowercase, unique
    pub name: String,

    /// Argon2 PHC string; never plaintext
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// Set by the store on insert
    pub created_at: DateTime<Utc>,

    /// Set by the store on every update
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create an unsaved user with no password
    pub fn new(name: impl Into<String>, full_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::default(),
            name: name.into(),
            password_hash: String::new(),
            full_name: full_name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Hash `password` with the current parameter set and store the hash
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Hash` if hashing fails; the user is unchanged.
    pub fn set_password(&mut self, password: &str) -> Result<(), CredentialError> {
        self.set_password_with(&CredentialHasher::default(), password)
    }

    /// Like `set_password`, with an explicit hasher
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Hash` if hashing fails; the user is unchanged.
    pub fn set_password_with(
        &mut self,
        hasher: &CredentialHasher,
        password: &str,
    ) -> Result<(), CredentialError> {
        self.password_hash = hasher.hash(password)?;
        Ok(())
    }

    /// Check `password` against the stored hash
    ///
    /// # Errors
    ///
    /// `Mismatch` for a wrong password, `MalformedHash` if no usable hash is set.
    pub fn check_password(&self, password: &str) -> Result<(), CredentialError> {
        CredentialHasher::default().verify(&self.password_hash, password)
    }

    /// True once a password hash has been set
    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("password_hash", &Sensitive::new(&self.password_hash))
            .field("full_name", &self.full_name)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
