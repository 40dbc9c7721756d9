//! Durable key-value storage trait abstraction.
//!
//! Mirrors what a browser's local storage offers: string values under
//! string keys that survive restarts. Calls are synchronous because the
//! backing store is local and fast; failures mean corruption or a broken
//! disk, not something a retry would fix.

use crate::error::StorageError;

/// Trait for durable key-value storage.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value under `key`.
    ///
    /// # Returns
    /// - `Ok(Some(value))` if the key exists
    /// - `Ok(None)` if it does not
    /// - `Err(error)` if reading failed
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Check whether `key` currently holds a value.
    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}
