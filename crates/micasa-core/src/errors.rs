use std::sync::Arc;

use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error crossing a crate boundary is tagged with exactly one kind.
/// Callers branch on the kind (or its stable code), never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,

    // Repository
    /// A uniqueness constraint was violated
    Duplicate,
    /// The referenced entity does not exist
    NotFound,
    /// Credentials did not verify (unknown user and wrong password alike)
    AuthenticationFailed,

    // Credentials
    /// Password hashing itself failed
    Credential,

    // Schema
    /// A migration unit failed at a specific version/statement
    Migration,

    // Integration
    /// Any other underlying store failure
    Persistence,
    /// The caller's cancellation token fired
    Cancelled,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Duplicate => "ERR_DUPLICATE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AuthenticationFailed => "ERR_AUTHENTICATION_FAILED",
            ExErrorKind::Credential => "ERR_CREDENTIAL",
            ExErrorKind::Migration => "ERR_MIGRATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the kind, optional context about where it happened, a human
/// message and, for storage failures, the original cause.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    version: Option<u32>,
    statement_index: Option<usize>,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            version: None,
            statement_index: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add migration version context
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Add failing statement index context (zero-based)
    pub fn with_statement_index(mut self, index: usize) -> Self {
        self.statement_index = Some(index);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// True if this error has the given kind
    pub fn is(&self, kind: ExErrorKind) -> bool {
        self.kind == kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the migration version, if any
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Get the failing statement index, if any
    pub fn statement_index(&self) -> Option<usize> {
        self.statement_index
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(version) = self.version {
            write!(f, " (version: {})", version)?;
        }
        if let Some(index) = self.statement_index {
            write!(f, " (statement: {})", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Failure modes of the credential hasher
///
/// Kept distinct for diagnostics. Anything user-facing collapses
/// `MalformedHash` and `Mismatch` into a single authentication failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Hashing failed (bad parameters, RNG failure)
    #[error("Password hashing failed: {message}")]
    Hash { message: String },

    /// The stored hash is not a parseable PHC string
    #[error("Stored password hash is malformed: {message}")]
    MalformedHash { message: String },

    /// The password does not match the stored hash
    #[error("Password does not match")]
    Mismatch,
}

impl From<CredentialError> for ExError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Hash { message } => ExError::new(ExErrorKind::Credential)
                .with_op("hash_password")
                .with_message(message),
            CredentialError::MalformedHash { .. } | CredentialError::Mismatch => {
                ExError::new(ExErrorKind::AuthenticationFailed)
                    .with_op("verify_password")
                    .with_message("Authentication failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_codes_are_unique() {
        let kinds = [
            ExErrorKind::InvalidInput,
            ExErrorKind::Duplicate,
            ExErrorKind::NotFound,
            ExErrorKind::AuthenticationFailed,
            ExErrorKind::Credential,
            ExErrorKind::Migration,
            ExErrorKind::Persistence,
            ExErrorKind::Cancelled,
            ExErrorKind::Internal,
        ];
        let codes: std::collections::HashSet<_> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_source_is_exposed() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = ExError::new(ExErrorKind::Persistence).with_source(io);
        let source = err.source().expect("source should be set");
        assert!(source.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_mismatch_and_malformed_are_indistinguishable() {
        let a: ExError = CredentialError::Mismatch.into();
        let b: ExError = CredentialError::MalformedHash {
            message: "bad salt".to_string(),
        }
        .into();
        assert_eq!(a.kind(), ExErrorKind::AuthenticationFailed);
        assert_eq!(a.kind(), b.kind());
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_display_includes_migration_context() {
        let err = ExError::new(ExErrorKind::Migration)
            .with_op("apply_migrations")
            .with_version(2)
            .with_statement_index(1)
            .with_message("syntax error");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_MIGRATION]"));
        assert!(text.contains("(version: 2)"));
        assert!(text.contains("(statement: 1)"));
    }
}
