//! Session encryption key material.

use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{SessionSetupError, StorageError};

pub const KEY_LEN: usize = 32;

/// 256-bit key used to seal the persisted credential.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Interpret a configured secret.
    ///
    /// Accepts 64 hex characters, or base64 (URL-safe or standard) of exactly
    /// 32 bytes. Anything else is treated as a passphrase and digested with
    /// SHA-256.
    pub fn from_secret(raw: &str) -> Result<Self, SessionSetupError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SessionSetupError::InvalidKey("secret is empty".to_string()));
        }

        if trimmed.len() == KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Some(key) = hex::decode(trimmed).ok().and_then(|b| Self::from_slice(&b)) {
                return Ok(key);
            }
        }

        for engine in [&general_purpose::URL_SAFE_NO_PAD, &general_purpose::STANDARD] {
            if let Some(key) = engine.decode(trimmed).ok().and_then(|b| Self::from_slice(&b)) {
                return Ok(key);
            }
        }

        let digest = Sha256::digest(trimmed.as_bytes());
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&digest);
        Ok(Self(bytes))
    }

    /// Load the key stored at `path`, creating a random one if the file is
    /// missing.
    ///
    /// An unreadable key file is replaced. Blobs sealed with the old key
    /// then fail to open and are wiped on the next load, which logs the
    /// user out instead of failing startup.
    pub fn load_or_create(path: &Path) -> Result<Self, SessionSetupError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                if let Some(key) = hex::decode(contents.trim())
                    .ok()
                    .and_then(|b| Self::from_slice(&b))
                {
                    return Ok(key);
                }
                tracing::warn!("Session key file {:?} is unreadable, generating a new key", path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No session key at {:?}, generating one", path);
            }
            Err(e) => return Err(StorageError::Io(e).into()),
        }

        let key = Self::generate();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
        let mut file = create_private(path).map_err(StorageError::Io)?;
        file.write_all(hex::encode(key.0).as_bytes()).map_err(StorageError::Io)?;
        // An existing file keeps its old mode through `create_private`.
        restrict_permissions(path)?;
        Ok(key)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Create or truncate `path` for writing, owner read/write only from the
/// first byte.
pub(crate) fn create_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(unix)]
pub(crate) fn restrict_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn restrict_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}
