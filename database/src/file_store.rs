//! [`FileStore`]: the file-backed [`PersistenceStore`] implementation.
//!
//! Each key maps to one `<root>/<key>.json` file holding a versioned
//! envelope (§4.1). Writes go to a sibling `.tmp` file first and are then
//! renamed into place, so a crash mid-write never leaves a torn file behind
//! — the rename is the only operation that can make the new content visible,
//! and a rename either lands wholly or not at all.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use orchestrator_core::error::PersistenceError;
use orchestrator_core::persistence::{validate_key, EnvelopeMetadata, PersistenceStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "_version")]
    version: u32,
    #[serde(rename = "_saved_at")]
    saved_at: DateTime<Utc>,
    #[serde(rename = "_key")]
    key: String,
    data: Value,
}

const ENVELOPE_VERSION: u32 = 1;

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates the store rooted at `root`, creating the directory if it
    /// does not yet exist. Each `PersistenceStore` namespace (general state
    /// vs. workflow checkpoints, §6.3) gets its own `FileStore` pointed at a
    /// different root rather than sharing one directory with key prefixes.
    pub async fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn tmp_path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json.tmp"))
    }

    async fn read_envelope(&self, key: &str) -> Result<Option<Envelope>, PersistenceError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::StateReadFailed(key.to_string(), e.to_string())),
        };
        match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                warn!(key, error = %e, "state envelope is corrupted; treating as absent");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl PersistenceStore for FileStore {
    async fn save(&self, key: &str, data: Value) -> Result<(), PersistenceError> {
        validate_key(key)?;
        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            saved_at: Utc::now(),
            key: key.to_string(),
            data,
        };
        let bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| PersistenceError::StateWriteFailed(key.into(), e.to_string()))?;

        let tmp_path = self.tmp_path_for(key);
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| PersistenceError::StateWriteFailed(key.into(), e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(PersistenceError::StateWriteFailed(key.into(), e.to_string()));
        }
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        validate_key(key)?;
        Ok(self.read_envelope(key).await?.map(|e| e.data))
    }

    async fn delete(&self, key: &str) -> Result<bool, PersistenceError> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PersistenceError::StateWriteFailed(key.into(), e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, PersistenceError> {
        validate_key(key)?;
        Ok(tokio::fs::try_exists(self.path_for(key))
            .await
            .unwrap_or(false))
    }

    async fn list_keys(&self) -> Result<Vec<String>, PersistenceError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| PersistenceError::StateReadFailed(self.root.display().to_string(), e.to_string()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PersistenceError::StateReadFailed(self.root.display().to_string(), e.to_string()))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<EnvelopeMetadata>, PersistenceError> {
        validate_key(key)?;
        Ok(self.read_envelope(key).await?.map(|e| EnvelopeMetadata {
            version: e.version,
            saved_at: e.saved_at,
            key: e.key,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (_dir, store) = store().await;
        store.save("agent-registry", json!({"a": 1})).await.unwrap();
        let loaded = store.load("agent-registry").await.unwrap().unwrap();
        assert_eq!(loaded, json!({"a": 1}));
    }

    #[tokio::test]
    async fn load_missing_key_returns_none() {
        let (_dir, store) = store().await;
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_leaves_no_tmp_file_behind() {
        let (dir, store) = store().await;
        store.save("k1", json!(null)).await.unwrap();
        assert!(!dir.path().join("k1.json.tmp").exists());
        assert!(dir.path().join("k1.json").exists());
    }

    #[tokio::test]
    async fn delete_reports_prior_existence() {
        let (_dir, store) = store().await;
        store.save("k1", json!(null)).await.unwrap();
        assert!(store.delete("k1").await.unwrap());
        assert!(!store.delete("k1").await.unwrap());
    }

    #[tokio::test]
    async fn list_keys_is_sorted() {
        let (_dir, store) = store().await;
        store.save("zeta", json!(null)).await.unwrap();
        store.save("alpha", json!(null)).await.unwrap();
        assert_eq!(store.list_keys().await.unwrap(), vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn corrupted_envelope_is_treated_as_absent() {
        let (dir, store) = store().await;
        tokio::fs::write(dir.path().join("broken.json"), b"not json")
            .await
            .unwrap();
        assert!(store.load("broken").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_invalid_keys() {
        let (_dir, store) = store().await;
        assert!(store.save("../escape", json!(null)).await.is_err());
    }

    #[tokio::test]
    async fn metadata_reports_version_and_key() {
        let (_dir, store) = store().await;
        store.save("k1", json!({"x": 1})).await.unwrap();
        let meta = store.get_metadata("k1").await.unwrap().unwrap();
        assert_eq!(meta.key, "k1");
        assert_eq!(meta.version, 1);
    }
}
