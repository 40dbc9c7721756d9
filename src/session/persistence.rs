//! Encrypted credential persistence at one fixed storage key.

use std::sync::Arc;

use crate::auth::{Credential, CredentialCodec};
use crate::error::{PersistenceError, StorageError};
use crate::traits::KeyValueStorage;

/// Default storage key for the sealed session blob.
pub const DEFAULT_STORAGE_KEY: &str = "blogdesk.session.v1";

/// Reads and writes the sealed credential blob.
///
/// A missing key is the normal logged-out state. Anything unreadable is
/// removed on load so the next start begins clean.
pub struct PersistenceGateway {
    storage: Arc<dyn KeyValueStorage>,
    codec: CredentialCodec,
    key: String,
}

impl PersistenceGateway {
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        codec: CredentialCodec,
        key: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            codec,
            key: key.into(),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Load the persisted credential.
    ///
    /// Read and decode failures are logged, the key is wiped, and `None`
    /// is returned.
    pub fn load(&self) -> Option<Credential> {
        let blob = match self.storage.get(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read persisted session, discarding: {}", e);
                self.heal();
                return None;
            }
        };

        match self.codec.deserialize(&blob) {
            Ok(credential) => {
                tracing::debug!("Loaded persisted session for {}", credential.subject);
                Some(credential)
            }
            Err(e) => {
                tracing::warn!("Persisted session unreadable, discarding: {}", e);
                self.heal();
                None
            }
        }
    }

    pub fn save(&self, credential: &Credential) -> Result<(), PersistenceError> {
        let blob = self.codec.serialize(credential)?;
        self.storage.set(&self.key, &blob)?;
        tracing::debug!("Persisted session for {}", credential.subject);
        Ok(())
    }

    /// Remove the persisted blob. Removing an absent key succeeds.
    pub fn wipe(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key)
    }

    fn heal(&self) {
        if let Err(e) = self.wipe() {
            tracing::warn!("Failed to remove unreadable session: {}", e);
        }
    }
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
