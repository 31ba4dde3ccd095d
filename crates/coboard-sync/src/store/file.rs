//! File-based key-value store for native platforms.

use std::fs;
use std::path::PathBuf;

use super::{KvStore, StoreError, StoreResult};

/// Key-value store persisted as one JSON-ish text file per key.
///
/// Used so a non-empty offline queue survives an application restart.
pub struct FileKvStore {
    /// Base directory for entries.
    base_path: PathBuf,
}

impl FileKvStore {
    /// Create a new store rooted at the given directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StoreResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StoreError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a store in the default location (`~/.local/share/coboard/state`
    /// on Unix, the platform data directory elsewhere).
    pub fn default_location() -> StoreResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StoreError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("coboard").join("state"))
    }

    /// Get the file path for a key.
    fn entry_path(&self, key: &str) -> PathBuf {
        // Sanitize the key to be safe for filenames
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_key))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| StoreError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.entry_path(key);
        fs::write(&path, value)
            .map_err(|e| StoreError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| StoreError::Io(format!("Failed to delete {}: {}", path.display(), e)))?;
        }
        Ok(())
    }
}
