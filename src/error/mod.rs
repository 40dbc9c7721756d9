//! Error types for the session subsystem.
//!
//! | Type | Raised by | Handling |
//! |------|-----------|----------|
//! | [`CodecError::Malformed`] | token claim decoding | treated as already expired |
//! | [`CodecError::Corrupt`] | blob decryption/decoding | treated as absent, storage wiped |
//! | [`StorageError`] | key-value backends | logged, treated as absent on read |
//! | [`AuthError`] | renewal and guards | surfaced, caller redirects to login |
//!
//! Decode and persistence errors never leave their component; only
//! [`AuthError`] reaches collaborators.

mod auth;
mod codec;
mod storage;

pub use auth::AuthError;
pub use codec::CodecError;
pub use storage::{PersistenceError, SessionSetupError, StorageError};
