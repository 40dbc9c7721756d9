//! Credential encoding errors.

use thiserror::Error;

/// Errors raised while decoding a bearer token or a persisted credential blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The bearer value does not carry a readable claim set.
    #[error("Malformed credential: {0}")]
    Malformed(String),

    /// The persisted blob cannot be decrypted or does not match the schema.
    #[error("Corrupt credential blob: {0}")]
    Corrupt(String),
}

impl CodecError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        CodecError::Malformed(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        CodecError::Corrupt(msg.into())
    }
}
