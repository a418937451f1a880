//! The persistence seam every stateful component depends on.
//!
//! The trait lives in `core` so the registry, executor and workflow engine
//! can depend on "a persistence store" without depending on its concrete
//! filesystem implementation, which lives in the `database` crate —
//! mirroring the existing repository-trait-in-core / impl-in-database split.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::PersistenceError;

/// The envelope metadata returned by `get_metadata` without deserializing
/// the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeMetadata {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub key: String,
}

/// A namespaced key/value store where every value is wrapped in a
/// versioned envelope (§4.1). Single-key writes are atomic; there is no
/// cross-key transactional guarantee.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Wraps `data` in an envelope and atomically writes it under `key`.
    async fn save(&self, key: &str, data: Value) -> Result<(), PersistenceError>;

    /// Returns the envelope's `data` field, or `None` if absent, malformed,
    /// or corrupted (those conditions are logged, never raised as errors —
    /// only I/O errors unrelated to content surface as `Err`).
    async fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError>;

    async fn delete(&self, key: &str) -> Result<bool, PersistenceError>;

    async fn exists(&self, key: &str) -> Result<bool, PersistenceError>;

    /// Sorted list of every key currently stored.
    async fn list_keys(&self) -> Result<Vec<String>, PersistenceError>;

    async fn get_metadata(&self, key: &str) -> Result<Option<EnvelopeMetadata>, PersistenceError>;
}

/// Validates the key grammar `^[A-Za-z0-9][A-Za-z0-9_-]*$`, the sole
/// defense against path traversal through a persistence key.
pub fn validate_key(key: &str) -> Result<(), PersistenceError> {
    let mut chars = key.chars();
    let first = chars
        .next()
        .ok_or_else(|| PersistenceError::InvalidKey("key must not be empty".into()))?;
    if !first.is_ascii_alphanumeric() {
        return Err(PersistenceError::InvalidKey(format!(
            "key '{key}' must start with an alphanumeric character"
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(PersistenceError::InvalidKey(format!(
            "key '{key}' may only contain letters, digits, hyphens and underscores"
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_keys() {
        assert!(validate_key("agent-registry").is_ok());
        assert!(validate_key("execution_history").is_ok());
        assert!(validate_key("a1").is_ok());
    }

    #[test]
    fn rejects_path_traversal_attempts() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("key.json").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("-leading-hyphen").is_err());
    }
}
