//! Blob storage for persisted waypoint paths.
//!
//! Paths are saved and loaded as opaque byte blobs under a logical key.
//! The engine never sees a filesystem path; the host injects whichever
//! backend suits it.

use crate::error::EnvError;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Read/write byte blobs by logical key.
///
/// Implementations must be thread-safe. A missing key is not an error:
/// `read` returns `Ok(None)`.
pub trait BlobStore: Send + Sync {
    /// Reads the blob stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, EnvError>;
    
    /// Replaces the blob stored under `key`.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), EnvError>;
    
    /// Deletes the blob under `key`. Returns whether one existed.
    fn remove(&self, key: &str) -> Result<bool, EnvError>;
}

impl<T: BlobStore + ?Sized> BlobStore for &T {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, EnvError> {
        (**self).read(key)
    }
    
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), EnvError> {
        (**self).write(key, bytes)
    }
    
    fn remove(&self, key: &str) -> Result<bool, EnvError> {
        (**self).remove(key)
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, EnvError> {
        (**self).read(key)
    }
    
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), EnvError> {
        (**self).write(key, bytes)
    }
    
    fn remove(&self, key: &str) -> Result<bool, EnvError> {
        (**self).remove(key)
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Volatile store, used in tests and simulation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }
    
    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, EnvError> {
        let blobs = self.blobs.lock()
            .map_err(|_| EnvError::storage("memory store lock poisoned"))?;
        Ok(blobs.get(key).cloned())
    }
    
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), EnvError> {
        let mut blobs = self.blobs.lock()
            .map_err(|_| EnvError::storage("memory store lock poisoned"))?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
    
    fn remove(&self, key: &str) -> Result<bool, EnvError> {
        let mut blobs = self.blobs.lock()
            .map_err(|_| EnvError::storage("memory store lock poisoned"))?;
        Ok(blobs.remove(key).is_some())
    }
}

// ============================================================================
// FILESYSTEM
// ============================================================================

/// One file per key inside a root directory.
///
/// Keys must be plain file names; anything that could escape the root
/// is rejected.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. The directory is created on
    /// first write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
    
    fn path_for(&self, key: &str) -> Result<PathBuf, EnvError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\']);
        if !valid {
            return Err(EnvError::invalid_key(key));
        }
        Ok(self.root.join(key))
    }
}

impl BlobStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, EnvError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EnvError::storage(format!("Failed to read {}: {}", path.display(), e))),
        }
    }
    
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), EnvError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        // Write-then-rename so a crash never leaves a truncated blob behind
        let mut tmp = NamedTempFile::new_in(&self.root)
            .map_err(|e| EnvError::storage(format!("Failed to create temp file in {}: {}", self.root.display(), e)))?;
        tmp.write_all(bytes)
            .map_err(|e| EnvError::storage(format!("Failed to write {}: {}", tmp.path().display(), e)))?;
        tmp.persist(&path)
            .map_err(|e| EnvError::storage(format!("Failed to rename into {}: {}", path.display(), e.error)))?;
        Ok(())
    }
    
    fn remove(&self, key: &str) -> Result<bool, EnvError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EnvError::storage(format!("Failed to remove {}: {}", path.display(), e))),
        }
    }
}

// ============================================================================
// SLED
// ============================================================================

/// Sled-based persistent store
///
/// Uses an embedded key-value database for durability. Clones share the
/// same database.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open a persistent store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EnvError> {
        let db = sled::open(path)
            .map_err(|e| EnvError::storage(format!("Failed to open sled DB: {}", e)))?;
        Ok(Self { db })
    }
    
    /// Create a temporary store, removed when dropped
    pub fn open_temp() -> Result<Self, EnvError> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()
            .map_err(|e| EnvError::storage(format!("Failed to open temp DB: {}", e)))?;
        Ok(Self { db })
    }
}

impl BlobStore for SledStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, EnvError> {
        let value = self.db.get(key.as_bytes())
            .map_err(|e| EnvError::storage(format!("Get failed: {}", e)))?;
        Ok(value.map(|v| v.to_vec()))
    }
    
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), EnvError> {
        self.db.insert(key.as_bytes(), bytes)
            .map_err(|e| EnvError::storage(format!("Insert failed: {}", e)))?;
        self.db.flush()
            .map_err(|e| EnvError::storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
    
    fn remove(&self, key: &str) -> Result<bool, EnvError> {
        let previous = self.db.remove(key.as_bytes())
            .map_err(|e| EnvError::storage(format!("Remove failed: {}", e)))?;
        self.db.flush()
            .map_err(|e| EnvError::storage(format!("Flush failed: {}", e)))?;
        Ok(previous.is_some())
    }
}
