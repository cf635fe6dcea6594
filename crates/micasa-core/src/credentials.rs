//! Credential hasher
//!
//! Argon2id with a random salt per hash. Hashes are PHC strings
//! (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), which embed the parameter
//! set they were produced with. Verification reads the parameters back out of
//! the stored string, so raising the current set never invalidates hashes
//! made under an older one.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::CredentialError;

/// A versioned Argon2id cost parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Label of this set, for diagnostics
    pub label: &'static str,
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Number of passes
    pub t_cost: u32,
    /// Degree of parallelism
    pub p_cost: u32,
}

impl HashParams {
    /// First production parameter set: 19 MiB, 2 passes, 1 lane
    pub const V1: HashParams = HashParams {
        label: "v1",
        m_cost: 19_456,
        t_cost: 2,
        p_cost: 1,
    };

    /// Parameter set used for newly hashed passwords
    pub const CURRENT: HashParams = HashParams::V1;

    /// Minimum-cost set for tests. Never use for real accounts.
    pub const TESTING: HashParams = HashParams {
        label: "testing",
        m_cost: 8,
        t_cost: 1,
        p_cost: 1,
    };

    fn to_argon2(self) -> Result<Params, CredentialError> {
        Params::new(self.m_cost, self.t_cost, self.p_cost, None).map_err(|e| {
            CredentialError::Hash {
                message: format!("invalid parameter set {}: {}", self.label, e),
            }
        })
    }
}

/// One-way salted password hasher
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    params: HashParams,
}

impl CredentialHasher {
    /// Hasher using the current production parameter set
    pub fn new() -> Self {
        Self::with_params(HashParams::CURRENT)
    }

    /// Hasher using an explicit parameter set
    pub fn with_params(params: HashParams) -> Self {
        Self { params }
    }

    /// Parameter set new hashes are produced with
    pub fn params(&self) -> HashParams {
        self.params
    }

    fn argon2(&self) -> Result<Argon2<'static>, CredentialError> {
        Ok(Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            self.params.to_argon2()?,
        ))
    }

    /// Hash a plaintext password into a PHC string
    ///
    /// # Errors
    ///
    /// `CredentialError::Hash` if the parameter set is invalid or hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hash {
                message: e.to_string(),
            })
    }

    /// Verify a plaintext password against a stored PHC string
    ///
    /// # Errors
    ///
    /// `CredentialError::MalformedHash` if `hash` cannot be parsed,
    /// `CredentialError::Mismatch` if the password is wrong.
    pub fn verify(&self, hash: &str, password: &str) -> Result<(), CredentialError> {
        let parsed = PasswordHash::new(hash).map_err(|e| CredentialError::MalformedHash {
            message: e.to_string(),
        })?;

        // Parameters come from the stored hash, not from self.params
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => Err(CredentialError::Mismatch),
            Err(e) => Err(CredentialError::MalformedHash {
                message: e.to_string(),
            }),
        }
    }

    /// True if `hash` was not produced with this hasher's parameter set
    ///
    /// Unparseable hashes always need rehashing.
    pub fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return true;
        };
        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(stored) => {
                stored.m_cost() != self.params.m_cost
                    || stored.t_cost() != self.params.t_cost
                    || stored.p_cost() != self.params.p_cost
            }
            Err(_) => true,
        }
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}
