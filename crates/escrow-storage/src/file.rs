//! JSON file storage backend.
//!
//! The whole store is one small JSON object. Every write rewrites it through a
//! temporary file followed by a rename, so a crash never leaves a truncated
//! file behind. On Unix the file is created with mode `0600`.

use crate::{DurableStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable storage in a single JSON file.
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create storage backed by `path`. The file is created lazily on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> StorageResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Encoding(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StorageError::Encoding(e.to_string())),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_vec_pretty(map)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = open_private(&tmp_path)?;
            file.write_all(&content)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), keys = map.len(), "Wrote durable storage");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl DurableStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock();
        let map = self.read_map()?;
        Ok(map.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        if map.remove(key).is_none() {
            return Ok(false);
        }
        self.write_map(&map)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));

        assert_eq!(storage.get("refresh_token").unwrap(), None);
        assert!(!storage.delete("refresh_token").unwrap());
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_values_survive_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileStorage::new(&path).set("refresh_token", "r1").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get("refresh_token").unwrap(),
            Some("r1".to_string())
        );
    }

    #[test]
    fn test_delete_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));

        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        assert!(storage.delete("a").unwrap());

        assert_eq!(storage.get("a").unwrap(), None);
        assert_eq!(storage.get("b").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_corrupt_file_is_an_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get("refresh_token"),
            Err(StorageError::Encoding(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileStorage::new(&path).set("refresh_token", "r1").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
