// # File Tracked Store
//
// File-based implementation of TrackedStateStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write to `<path>.tmp`, then rename over the state file
// - Backup: the previous state file is copied to `<path>.backup` first
// - Recovery: an unparseable state file falls back to the backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "index:b1/idx1": {
//       "identity": {"object_type": "index", "scopes": ["b1"], "name": "idx1"},
//       "ownership": "owned",
//       "observed": {"cacheMode": {"kind": "scalar", "state": "Unset"}},
//       "last_updated": "2026-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::identity::ObjectIdentity;
use crate::traits::tracked_store::{TrackedRecord, TrackedStateStore};
use crate::Error;

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based tracked store
///
/// Every mutation is written through to disk before it returns.
#[derive(Debug)]
pub struct FileTrackedStore {
    path: PathBuf,
    records: Arc<RwLock<BTreeMap<String, TrackedRecord>>>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFile {
    version: String,
    records: BTreeMap<String, TrackedRecord>,
}

impl FileTrackedStore {
    /// Open (or start) a state file
    ///
    /// Parent directories are created as needed. A corrupted file is
    /// replaced by its backup; with no usable backup the store starts empty.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let records = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_with_recovery(path: &Path) -> Result<BTreeMap<String, TrackedRecord>, Error> {
        let err = match Self::load(path).await {
            Ok(records) => {
                tracing::debug!("Loaded tracked state: {} records", records.len());
                return Ok(records);
            }
            Err(Error::Json(e)) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            "State file {} is corrupted ({}); trying the backup",
            path.display(),
            err
        );

        let backup = Self::backup_path(path);
        if !backup.exists() {
            tracing::warn!("No backup file found. Starting with empty state.");
            return Ok(BTreeMap::new());
        }

        match Self::load(&backup).await {
            Ok(records) => {
                tracing::info!("Recovered tracked state from backup: {} records", records.len());
                if let Err(e) = fs::copy(&backup, path).await {
                    tracing::error!("Failed to restore state file from backup: {}", e);
                }
                Ok(records)
            }
            Err(e) => {
                tracing::error!("Backup also unusable: {}. Starting with empty state.", e);
                Ok(BTreeMap::new())
            }
        }
    }

    async fn load(path: &Path) -> Result<BTreeMap<String, TrackedRecord>, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::state_store(format!("Failed to read state file {}: {}", path.display(), e))
        })?;

        let file: StateFile = serde_json::from_str(&content)?;
        if file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Loading anyway.",
                STATE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.records)
    }

    async fn write(&self, records: &BTreeMap<String, TrackedRecord>) -> Result<(), Error> {
        let file = StateFile {
            version: STATE_FILE_VERSION.to_string(),
            records: records.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.flush().await?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Tracked state written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl TrackedStateStore for FileTrackedStore {
    async fn get(&self, identity: &ObjectIdentity) -> Result<Option<TrackedRecord>, Error> {
        Ok(self.records.read().await.get(&identity.key()).cloned())
    }

    async fn put(&self, record: &TrackedRecord) -> Result<(), Error> {
        let mut records = self.records.write().await;
        records.insert(record.identity.key(), record.clone());
        self.write(&records).await
    }

    async fn remove(&self, identity: &ObjectIdentity) -> Result<(), Error> {
        let mut records = self.records.write().await;
        if records.remove(&identity.key()).is_none() {
            return Ok(());
        }
        self.write(&records).await
    }

    async fn list(&self) -> Result<Vec<ObjectIdentity>, Error> {
        let records = self.records.read().await;
        Ok(records.values().map(|r| r.identity.clone()).collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        let records = self.records.read().await;
        self.write(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeMap, ObservedState};
    use crate::lifecycle::Ownership;
    use crate::value::AttributeValue;
    use tempfile::tempdir;

    fn record(label: &str) -> TrackedRecord {
        let observed = ObservedState::new(
            AttributeMap::new()
                .with("label", AttributeValue::scalar(label))
                .with("tags", AttributeValue::set(["x", "y"])),
        );
        TrackedRecord::new(
            ObjectIdentity::new("index", vec!["b1".into()], "idx1"),
            Ownership::Owned,
            observed,
        )
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileTrackedStore::new(&path).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());

        let r = record("a");
        store.put(&r).await.unwrap();
        assert!(path.exists());

        let reopened = FileTrackedStore::new(&path).await.unwrap();
        let loaded = reopened.get(&r.identity).await.unwrap().unwrap();
        assert_eq!(loaded.observed, r.observed);
        assert_eq!(loaded.ownership, Ownership::Owned);
    }

    #[tokio::test]
    async fn test_file_store_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = FileTrackedStore::new(&path).await.unwrap();
        let r = record("a");
        store.put(&r).await.unwrap();
        store.remove(&r.identity).await.unwrap();

        let reopened = FileTrackedStore::new(&path).await.unwrap();
        assert!(reopened.get(&r.identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileTrackedStore::new(&path).await.unwrap();
        store.put(&record("first")).await.unwrap();
        // second write copies the first file to .backup
        store.put(&record("second")).await.unwrap();
        assert!(FileTrackedStore::backup_path(&path).exists());

        fs::write(&path, b"not json").await.unwrap();

        let recovered = FileTrackedStore::new(&path).await.unwrap();
        let r = recovered.get(&record("x").identity).await.unwrap().unwrap();
        assert_eq!(
            r.observed.get(&"label".into()),
            Some(&AttributeValue::scalar("first"))
        );
    }

    #[tokio::test]
    async fn test_corrupted_without_backup_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{").await.unwrap();

        let store = FileTrackedStore::new(&path).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
