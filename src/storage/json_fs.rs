// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filesystem-backed JSON storage.
//!
//! Updates are atomic (temp file + rename). Inserts that must be unique
//! use [`FileStorage::write_json_new`], which creates the file with
//! `create_new` so that concurrent writers serialize on the filesystem:
//! exactly one create succeeds, every other writer gets
//! [`StorageError::AlreadyExists`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Entity not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Entity already exists (uniqueness violation)
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Storage not initialized
    #[error("storage not initialized")]
    NotInitialized,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// JSON file storage rooted at [`StoragePaths`].
#[derive(Debug, Clone)]
pub struct FileStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl FileStorage {
    /// Create a new FileStorage instance.
    ///
    /// Does NOT create the directory structure. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Initialize the storage directory structure.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn initialize(&mut self) -> StorageResult<()> {
        let dirs = [self.paths.profiles_dir(), self.paths.user_roles_dir()];
        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Check that the storage directory is writable.
    ///
    /// Performs a write-read-delete round trip.
    pub fn health_check(&self) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::Io(io::Error::other(
                "health check data mismatch",
            )));
        }
        Ok(())
    }

    /// Read a JSON file and deserialize it.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)?;
        Ok(value)
    }

    /// Write a JSON file, overwriting any existing content (atomic via
    /// temp file + rename).
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Write a JSON file that must not already exist.
    ///
    /// Uses `create_new`, so the filesystem is the serialization point for
    /// concurrent inserts: the loser gets `AlreadyExists` and must
    /// re-resolve as a read.
    pub fn write_json_new<T: Serialize>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
    ) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists(path.display().to_string())
                } else {
                    StorageError::Io(e)
                }
            })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        Ok(())
    }

    /// Check if a file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Delete a file.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// List the file stems in a directory matching an extension.
    pub fn list_files(&self, dir: impl AsRef<Path>, extension: &str) -> StorageResult<Vec<String>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
                if let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(id.to_string());
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        value: u32,
    }

    fn test_storage() -> (FileStorage, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let mut storage = FileStorage::new(StoragePaths::new(dir.path()));
        storage.initialize().expect("initialize");
        (storage, dir)
    }

    #[test]
    fn uninitialized_storage_rejects_operations() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(StoragePaths::new(dir.path()));
        let result: StorageResult<Doc> = storage.read_json(dir.path().join("x.json"));
        assert!(matches!(result, Err(StorageError::NotInitialized)));
    }

    #[test]
    fn write_and_read_round_trip() {
        let (storage, dir) = test_storage();
        let path = dir.path().join("doc.json");
        let doc = Doc {
            name: "a".into(),
            value: 7,
        };

        storage.write_json(&path, &doc).unwrap();
        let loaded: Doc = storage.read_json(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn write_json_new_rejects_existing_file() {
        let (storage, dir) = test_storage();
        let path = dir.path().join("doc.json");
        let doc = Doc {
            name: "a".into(),
            value: 1,
        };

        storage.write_json_new(&path, &doc).unwrap();
        let result = storage.write_json_new(&path, &doc);
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));

        // The first write's content is untouched.
        let loaded: Doc = storage.read_json(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn list_files_filters_by_extension() {
        let (storage, dir) = test_storage();
        storage
            .write_json(dir.path().join("a.json"), &Doc { name: "a".into(), value: 1 })
            .unwrap();
        storage
            .write_json(dir.path().join("b.json"), &Doc { name: "b".into(), value: 2 })
            .unwrap();
        std::fs::write(dir.path().join("ignore.txt"), b"x").unwrap();

        let mut ids = storage.list_files(dir.path(), "json").unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn list_files_on_missing_dir_is_empty() {
        let (storage, dir) = test_storage();
        let ids = storage.list_files(dir.path().join("nope"), "json").unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn health_check_round_trips() {
        let (storage, _dir) = test_storage();
        storage.health_check().unwrap();
    }
}
