//! Durable key-value storage for the client's identity record.
//!
//! The store keeps at most two keys: [`CREDENTIAL_KEY`] and [`GUEST_KEY`].
//! Access is synchronous; the record is a few hundred bytes.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Key holding the raw bearer credential.
pub const CREDENTIAL_KEY: &str = "token";

/// Key holding the serialized guest descriptor.
pub const GUEST_KEY: &str = "guest";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage lock poisoned")]
    Poisoned,

    #[error("storage io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// String-keyed persistence surviving process restarts.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S> DurableStorage for Arc<S>
where
    S: DurableStorage + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// JSON file storage (`<state dir>/session.json`).
///
/// Every write replaces the whole file through a temp file + rename, so a
/// crash leaves either the old or the new record.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub const FILE_NAME: &'static str = "session.json";

    /// Open (or lazily create) the storage file inside `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: dir.join(Self::FILE_NAME),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if bytes.is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        let data = serde_json::to_vec_pretty(entries).map_err(|e| StorageError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&data).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;

        // A corrupt file is replaced rather than blocking every future write.
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StorageError::Corrupt { reason, .. }) => {
                tracing::warn!(path = ?self.path, %reason, "discarding corrupt session file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };

        if apply(&mut entries) {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(CREDENTIAL_KEY).unwrap(), None);

        storage.set(CREDENTIAL_KEY, "a.b.c").unwrap();
        assert_eq!(storage.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("a.b.c"));

        storage.remove(CREDENTIAL_KEY).unwrap();
        storage.remove(CREDENTIAL_KEY).unwrap();
        assert_eq!(storage.get(CREDENTIAL_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let storage = FileStorage::open(dir.path()).unwrap();
            storage.set(GUEST_KEY, r#"{"role":"guest","name":"Guest User"}"#).unwrap();
            storage.set(CREDENTIAL_KEY, "a.b.c").unwrap();
            storage.remove(CREDENTIAL_KEY).unwrap();
        }

        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get(CREDENTIAL_KEY).unwrap(), None);
        assert_eq!(
            reopened.get(GUEST_KEY).unwrap().as_deref(),
            Some(r#"{"role":"guest","name":"Guest User"}"#)
        );
        assert!(!reopened.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn file_storage_creates_missing_directories_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let storage = FileStorage::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(!storage.path().exists());

        // Removing from a file that was never written does not create it.
        storage.remove(GUEST_KEY).unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn corrupt_file_is_reported_on_read_and_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        std::fs::write(storage.path(), b"{not json").unwrap();

        assert!(matches!(
            storage.get(CREDENTIAL_KEY),
            Err(StorageError::Corrupt { .. })
        ));

        storage.set(CREDENTIAL_KEY, "a.b.c").unwrap();
        assert_eq!(storage.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("a.b.c"));
    }

    #[test]
    fn shared_handle_delegates() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        let alias = Arc::clone(&storage);

        alias.set(GUEST_KEY, "{}").unwrap();
        assert_eq!(storage.get(GUEST_KEY).unwrap().as_deref(), Some("{}"));
    }
}
