//! Durable key/value persistence for session and preference state.
//!
//! # Design
//! - Model browser-style local storage: string keys, serialized string values.
//! - Blobs are versioned JSON so future shape changes can be detected instead
//!   of silently misread.
//! - File writes go through a sibling temp file and `rename`, so a crash never
//!   leaves a half-written state file behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Storage key holding the persisted session.
pub const SESSION_KEY: &str = "gallery.auth";
/// Storage key holding the persisted theme preference.
pub const THEME_KEY: &str = "gallery.theme";
/// Current persisted blob version.
pub const BLOB_VERSION: u32 = 1;

/// Minimal key/value persistence contract.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing medium cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing medium cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `entries`.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Single JSON file mapping keys to serialized values.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store backed by `path`. The file is created lazily on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "state file is not a JSON object; starting from empty state"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let body =
            serde_json::to_string_pretty(map).map_err(|source| StorageError::Encode { source })?;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, body).map_err(|source| StorageError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_map()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct VersionedBlob<T> {
    version: u32,
    state: T,
}

/// Serialize `state` into a versioned blob.
pub(crate) fn encode_blob<T: Serialize>(state: &T) -> Result<String, StorageError> {
    serde_json::to_string(&VersionedBlob {
        version: BLOB_VERSION,
        state,
    })
    .map_err(|source| StorageError::Encode { source })
}

/// Why a persisted blob could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlobDefect {
    /// Not JSON, or not the expected shape.
    Malformed(String),
    /// Well-formed but written by an unknown version.
    UnknownVersion(u32),
}

impl BlobDefect {
    /// Short description for log fields.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Malformed(detail) => format!("malformed: {detail}"),
            Self::UnknownVersion(version) => format!("unknown version {version}"),
        }
    }
}

/// Decode a versioned blob written by [`encode_blob`].
pub(crate) fn decode_blob<T: DeserializeOwned>(raw: &str) -> Result<T, BlobDefect> {
    let blob: VersionedBlob<serde_json::Value> =
        serde_json::from_str(raw).map_err(|err| BlobDefect::Malformed(err.to_string()))?;
    if blob.version != BLOB_VERSION {
        return Err(BlobDefect::UnknownVersion(blob.version));
    }
    serde_json::from_value(blob.state).map_err(|err| BlobDefect::Malformed(err.to_string()))
}

/// Load `key` from `store`, logging and swallowing read failures.
pub(crate) fn load_logged(store: &dyn KeyValueStore, key: &'static str) -> Option<String> {
    match store.load(key) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read persisted state");
            None
        }
    }
}

/// Persist `state` under `key`, logging failures instead of surfacing them.
pub(crate) fn persist_logged<T: Serialize>(store: &dyn KeyValueStore, key: &'static str, state: &T) {
    let result = encode_blob(state).and_then(|blob| store.save(key, &blob));
    if let Err(err) = result {
        log_storage_error("save", key, &err);
    }
}

fn log_storage_error(operation: &'static str, key: &'static str, err: &StorageError) {
    tracing::error!(operation, key, error = %err, "storage operation failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn memory_store_round_trips_and_removes() {
        let store = MemoryStore::new();
        assert_eq!(store.load("k").expect("load"), None);
        store.save("k", "v").expect("save");
        assert_eq!(store.load("k").expect("load").as_deref(), Some("v"));
        store.remove("k").expect("remove");
        store.remove("k").expect("second remove is a no-op");
        assert_eq!(store.load("k").expect("load"), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");

        let first = FileStore::new(&path);
        first.save(SESSION_KEY, "one").expect("save session");
        first.save(THEME_KEY, "two").expect("save theme");

        let second = FileStore::new(&path);
        assert_eq!(second.load(SESSION_KEY).expect("load").as_deref(), Some("one"));
        assert_eq!(second.load(THEME_KEY).expect("load").as_deref(), Some("two"));

        second.remove(SESSION_KEY).expect("remove");
        assert_eq!(first.load(SESSION_KEY).expect("load"), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_treats_garbage_as_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").expect("write garbage");

        let store = FileStore::new(&path);
        assert_eq!(store.load(SESSION_KEY).expect("load"), None);
        store.save(SESSION_KEY, "fresh").expect("save over garbage");
        assert_eq!(store.load(SESSION_KEY).expect("load").as_deref(), Some("fresh"));
    }

    #[test]
    fn blobs_are_versioned() {
        let encoded = encode_blob(&json!({"dark": true})).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&encoded).expect("json");
        assert_eq!(value["version"], json!(BLOB_VERSION));

        let decoded: serde_json::Value = decode_blob(&encoded).expect("decode");
        assert_eq!(decoded, json!({"dark": true}));

        let future = json!({"version": 99, "state": {}}).to_string();
        assert_eq!(
            decode_blob::<serde_json::Value>(&future),
            Err(BlobDefect::UnknownVersion(99))
        );
        assert!(matches!(
            decode_blob::<serde_json::Value>("{"),
            Err(BlobDefect::Malformed(_))
        ));
    }
}
