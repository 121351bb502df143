//! Local key/value persistence for learner progress.
//!
//! One value per key; the last write wins.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressStoreError {
    #[error("progress store i/o failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("progress store lock poisoned: {0}")]
    Poisoned(String),
}

pub trait ProgressStore: Send + Sync {
    /// Reads the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, ProgressStoreError>;

    /// Replaces the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the backend cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), ProgressStoreError>;

    /// Removes `key`; removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), ProgressStoreError>;
}

/// Process-local store for tests and throwaway sessions.
#[derive(Clone, Default)]
pub struct MemoryProgressStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, key: &str) -> Result<Option<String>, ProgressStoreError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| ProgressStoreError::Poisoned(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ProgressStoreError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| ProgressStoreError::Poisoned(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ProgressStoreError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| ProgressStoreError::Poisoned(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    /// Opens (and creates if needed) the store directory.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ProgressStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ProgressStoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for(key))
    }
}

/// Bytes kept verbatim in file names; everything else, `%` included, is escaped.
const FILE_NAME_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// `progress:ada:7` becomes `progress%3Aada%3A7.json`. Distinct keys never
/// share a file.
fn file_name_for(key: &str) -> String {
    format!("{}.json", utf8_percent_encode(key, FILE_NAME_SAFE))
}

impl ProgressStore for FileProgressStore {
    fn load(&self, key: &str) -> Result<Option<String>, ProgressStoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProgressStoreError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ProgressStoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| ProgressStoreError::Io {
            key: key.to_owned(),
            source,
        };
        // Readers never observe a partially written file.
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }

    fn remove(&self, key: &str) -> Result<(), ProgressStoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ProgressStoreError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_removes() {
        let store = MemoryProgressStore::new();
        assert_eq!(store.load("progress:ada:1").unwrap(), None);
        store.save("progress:ada:1", r#"{"3":true}"#).unwrap();
        assert_eq!(
            store.load("progress:ada:1").unwrap().as_deref(),
            Some(r#"{"3":true}"#)
        );
        store.remove("progress:ada:1").unwrap();
        store.remove("progress:ada:1").unwrap();
        assert_eq!(store.load("progress:ada:1").unwrap(), None);
    }

    #[test]
    fn file_names_are_escaped() {
        assert_eq!(file_name_for("progress:ada:7"), "progress%3Aada%3A7.json");
        assert_eq!(
            file_name_for("progress:../x:7"),
            "progress%3A%2E%2E%2Fx%3A7.json"
        );
        assert_eq!(file_name_for("progress:élodie:1"), "progress%3A%C3%A9lodie%3A1.json");
    }

    #[test]
    fn look_alike_learners_get_distinct_files() {
        let pairs = [
            ("progress:élodie:1", "progress:àlodie:1"),
            ("progress:a:b:1", "progress:a_b:1"),
            ("progress:jean.d:1", "progress:jean_d:1"),
            ("progress:50%:1", "progress:50%25:1"),
        ];
        for (left, right) in pairs {
            assert_ne!(file_name_for(left), file_name_for(right), "{left} vs {right}");
        }

        let dir = tempfile::tempdir().unwrap();
        let store = FileProgressStore::open(dir.path()).unwrap();
        store.save("progress:élodie:1", r#"{"1":true}"#).unwrap();
        assert_eq!(store.load("progress:àlodie:1").unwrap(), None);
        assert_eq!(
            store.load("progress:élodie:1").unwrap().as_deref(),
            Some(r#"{"1":true}"#)
        );
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProgressStore::open(dir.path().join("progress")).unwrap();
        store.save("progress:ada:7", r#"{"12":true}"#).unwrap();

        let reopened = FileProgressStore::open(dir.path().join("progress")).unwrap();
        assert_eq!(
            reopened.load("progress:ada:7").unwrap().as_deref(),
            Some(r#"{"12":true}"#)
        );
        assert_eq!(reopened.load("progress:bob:7").unwrap(), None);

        reopened.remove("progress:ada:7").unwrap();
        assert_eq!(store.load("progress:ada:7").unwrap(), None);
    }

    #[test]
    fn last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProgressStore::open(dir.path()).unwrap();
        store.save("k", "first").unwrap();
        store.save("k", "second").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("second"));
    }
}
