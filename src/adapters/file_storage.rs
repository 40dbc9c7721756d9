//! File-backed key-value storage.
//!
//! Each key is one file under the storage directory (`~/.blogdesk` by
//! default). Writes go to a temporary sibling first and are renamed into
//! place, so a crash mid-write leaves either the old value or the new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::auth::key::{create_private, restrict_permissions};
use crate::error::StorageError;
use crate::traits::KeyValueStorage;

/// The storage directory name under the home directory.
pub const DATA_DIR: &str = ".blogdesk";

/// File under the storage directory holding the generated session key.
/// Never available as a storage key.
pub const KEY_FILE: &str = "session.key";

/// Directory-backed implementation of [`KeyValueStorage`].
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create storage under `~/.blogdesk`.
    ///
    /// Returns `None` if the home directory cannot be determined.
    pub fn new() -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self::with_path(home.join(DATA_DIR)))
    }

    /// Create storage rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn with_path(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid || key == KEY_FILE {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;

        let tmp_path = self.root.join(format!(".{}.tmp", key));
        {
            let mut file = create_private(&tmp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        restrict_permissions(&tmp_path)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
