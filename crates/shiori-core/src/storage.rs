//! Durable key-value backends for the persisted stores.
//!
//! Each store owns one named entry holding a JSON snapshot of its full state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

pub trait StateBackend: Send + Sync {
    /// Read the blob stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Replace the blob stored under `key`.
    fn save(&self, key: &str, blob: &str) -> Result<(), CoreError>;
}

/// One `<key>.json` file per entry inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateBackend for JsonFileBackend {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), CoreError> {
        std::fs::create_dir_all(&self.dir)?;
        // Replaced via rename; readers never see a partial file.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory backend. Clones share the same entries, which lets tests
/// simulate a restart by opening a second store on the same backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::Storage("memory backend poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), CoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::Storage("memory backend poisoned".into()))?;
        entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// Load and decode a snapshot. A blob that no longer decodes is logged and
/// treated as absent so the store starts fresh.
pub fn load_snapshot<T: DeserializeOwned>(
    backend: &dyn StateBackend,
    key: &str,
) -> Result<Option<T>, CoreError> {
    let Some(blob) = backend.load(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&blob) {
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unreadable persisted state");
            Ok(None)
        }
    }
}

pub fn save_snapshot<T: Serialize>(
    backend: &dyn StateBackend,
    key: &str,
    state: &T,
) -> Result<(), CoreError> {
    let blob = serde_json::to_string(state)?;
    backend.save(key, &blob)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("state"));

        assert_eq!(backend.load("anime-cache").unwrap(), None);
        backend.save("anime-cache", "{\"a\":1}").unwrap();
        assert_eq!(
            backend.load("anime-cache").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(dir.path().join("state/anime-cache.json").exists());
    }

    #[test]
    fn test_memory_backend_shared_between_clones() {
        let a = MemoryBackend::new();
        let b = a.clone();
        a.save("k", "v").unwrap();
        assert_eq!(b.load("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_corrupt_snapshot_is_treated_as_absent() {
        let backend = MemoryBackend::new();
        backend.save("k", "not json").unwrap();
        let loaded: Option<Vec<u32>> = load_snapshot(&backend, "k").unwrap();
        assert!(loaded.is_none());
    }
}
