//! Persistent key/value storage for session tokens.
//!
//! The browser client kept its tokens in local storage under two fixed keys;
//! [`FileTokenStore`] keeps the same shape as a small JSON object on disk.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage key of the short-lived bearer credential.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the long-lived credential used to mint access tokens.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O failed on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token store '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// String key/value storage for session credentials.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store, used by tests and short-lived embeddings.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with initial entries.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.entries.lock();
            for (k, v) in entries {
                map.insert(k.to_string(), v.to_string());
            }
        }
        store
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON-file store. The file is rewritten whole on every change and removed
/// once the last key is gone.
pub struct FileTokenStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    guard: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(self.io_err(e)),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let body = serde_json::to_vec_pretty(entries).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // write-then-rename so a crash never leaves half a file behind
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = open_private(&tmp).map_err(|e| self.io_err(e))?;
            file.write_all(&body).map_err(|e| self.io_err(e))?;
            file.sync_all().map_err(|e| self.io_err(e))?;
        }
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::File::create(path)
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _g = self.guard.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _g = self.guard.lock();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _g = self.guard.lock();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);

        store.set(ACCESS_TOKEN_KEY, "abc").unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        store.remove(ACCESS_TOKEN_KEY).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_uses_fixed_key_names_on_disk() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state").join("session.json");
        let store = FileTokenStore::new(&path);

        store.set(ACCESS_TOKEN_KEY, "a.b.c").unwrap();
        store.set(REFRESH_TOKEN_KEY, "r-1").unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["accessToken"], "a.b.c");
        assert_eq!(raw["refreshToken"], "r-1");

        // a second handle sees the same state
        let again = FileTokenStore::new(&path);
        assert_eq!(again.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r-1"));
    }

    #[test]
    fn file_store_deletes_file_when_emptied() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        let store = FileTokenStore::new(&path);

        store.set(ACCESS_TOKEN_KEY, "x").unwrap();
        assert!(path.exists());

        store.remove(ACCESS_TOKEN_KEY).unwrap();
        store.remove(REFRESH_TOKEN_KEY).unwrap();
        assert!(!path.exists());
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_reports_corruption() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileTokenStore::new(&path).get(ACCESS_TOKEN_KEY).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("session.json");
        FileTokenStore::new(&path).set(ACCESS_TOKEN_KEY, "x").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
