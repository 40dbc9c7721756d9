//! Durable storage and persistence errors.

use thiserror::Error;

use super::codec::CodecError;

/// Errors from a key-value storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem or OS error.
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be mapped onto the backend.
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    /// Backend-specific failure (used by test doubles).
    #[error("Storage error: {0}")]
    Other(String),
}

/// Errors while writing the session blob.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors while assembling a session manager.
#[derive(Debug, Error)]
pub enum SessionSetupError {
    /// Configured session secret cannot be turned into a key.
    #[error("Invalid session key: {0}")]
    InvalidKey(String),

    /// Data directory or key file could not be prepared.
    #[error("Failed to prepare session storage: {0}")]
    Storage(#[from] StorageError),
}
