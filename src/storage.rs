//! Storage layer for friction
//!
//! State lives as two JSON documents in a single data directory:
//!
//! ```text
//! <data_dir>/
//!   friction.toml         # Optional configuration
//!   friction.lock         # Held for a whole load-modify-save transaction
//!   projects.json         # Project collection
//!   projects.json.lock
//!   tasks.json            # Task collection
//!   tasks.json.lock
//! ```
//!
//! The tracker talks to storage only through [`Gateway`], a synchronous
//! key-value contract with two keys plus a store-wide lock. [`FileStorage`]
//! backs it with the files above; [`MemoryStorage`] keeps everything in
//! memory for tests.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "FRICTION_DATA_DIR";

/// Store-wide lock file name
const STORE_LOCK_FILE: &str = "friction.lock";

/// The two persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Projects,
    Tasks,
}

impl Key {
    pub fn as_str(self) -> &'static str {
        match self {
            Key::Projects => "projects",
            Key::Tasks => "tasks",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key-value load/save of raw collection documents.
pub trait Gateway: Send {
    /// Raw JSON for `key`, or `None` if nothing was ever saved.
    fn load(&self, key: Key) -> Result<Option<String>>;

    /// Replace the document stored under `key`.
    fn save(&self, key: Key, json: &str) -> Result<()>;

    /// Exclude other writers of this store until the guard drops.
    ///
    /// Single-process stores need no guard.
    fn lock(&self) -> Result<StoreLock> {
        Ok(StoreLock::unguarded())
    }
}

/// Exclusive hold on a whole store, released on drop
#[must_use = "the store is unlocked as soon as the guard drops"]
pub struct StoreLock {
    _file: Option<FileLock>,
}

impl StoreLock {
    fn unguarded() -> Self {
        Self { _file: None }
    }
}

/// File-backed storage rooted at a data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    data_dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Resolve the data directory: explicit path, then `FRICTION_DATA_DIR`,
    /// then the platform data directory.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::new(dir));
        }
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::new(PathBuf::from(dir)));
        }
        let dirs = ProjectDirs::from("", "", "friction").ok_or_else(|| {
            Error::OperationFailed(format!(
                "no home directory found; set {DATA_DIR_ENV} or pass --data-dir"
            ))
        })?;
        Ok(Self::new(dirs.data_dir()))
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(crate::config::CONFIG_FILE)
    }

    pub fn collection_file(&self, key: Key) -> PathBuf {
        self.data_dir.join(format!("{}.json", key.as_str()))
    }

    fn store_lock_file(&self) -> PathBuf {
        self.data_dir.join(STORE_LOCK_FILE)
    }
}

impl Gateway for FileStorage {
    fn load(&self, key: Key) -> Result<Option<String>> {
        lock::read_locked_str(self.collection_file(key), self.lock_timeout_ms)
    }

    fn save(&self, key: Key, json: &str) -> Result<()> {
        lock::write_atomic_locked(self.collection_file(key), json.as_bytes(), self.lock_timeout_ms)
    }

    fn lock(&self) -> Result<StoreLock> {
        let file = FileLock::acquire(self.store_lock_file(), self.lock_timeout_ms)?;
        Ok(StoreLock { _file: Some(file) })
    }
}

/// In-memory storage; clones share the same documents
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    docs: Arc<Mutex<HashMap<Key, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document, e.g. a legacy or corrupt payload.
    pub fn with_document(self, key: Key, json: impl Into<String>) -> Self {
        self.insert(key, json.into());
        self
    }

    pub fn document(&self, key: Key) -> Option<String> {
        self.docs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned()
    }

    fn insert(&self, key: Key, json: String) {
        self.docs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, json);
    }
}

impl Gateway for MemoryStorage {
    fn load(&self, key: Key) -> Result<Option<String>> {
        Ok(self.document(key))
    }

    fn save(&self, key: Key, json: &str) -> Result<()> {
        self.insert(key, json.to_string());
        Ok(())
    }
}
