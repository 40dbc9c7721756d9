//! Session configuration.
//!
//! Use the builder methods to customize, or [`SessionConfig::from_env`] to
//! apply `BLOGDESK_*` environment overrides on top of the defaults.
//!
//! # Example
//!
//! ```ignore
//! use blogdesk::config::SessionConfig;
//! use std::time::Duration;
//!
//! let config = SessionConfig::default()
//!     .with_renewal_skew(Duration::from_secs(120))
//!     .with_api_base_url("https://blog.example.com/api");
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::file_storage::DATA_DIR;
pub use crate::adapters::file_storage::KEY_FILE;
use crate::auth::api::{DEFAULT_API_URL, DEFAULT_REFRESH_PATH};
use crate::auth::SessionKey;
use crate::error::SessionSetupError;
use crate::session::DEFAULT_STORAGE_KEY;

pub const ENV_RENEWAL_SKEW: &str = "BLOGDESK_RENEWAL_SKEW_SECS";
pub const ENV_CHECK_INTERVAL: &str = "BLOGDESK_CHECK_INTERVAL_SECS";
pub const ENV_DATA_DIR: &str = "BLOGDESK_DATA_DIR";
pub const ENV_API_URL: &str = "BLOGDESK_API_URL";
pub const ENV_SEND_SUBJECT: &str = "BLOGDESK_SEND_SUBJECT";
pub const ENV_SESSION_KEY: &str = "BLOGDESK_SESSION_KEY";

/// Configuration for a [`crate::session::SessionManager`].
#[derive(Clone)]
pub struct SessionConfig {
    /// Renew when this much validity or less remains (default: 5 minutes)
    pub renewal_skew: Duration,
    /// Background check period (default: 4 minutes)
    pub check_interval: Duration,
    /// Storage key for the sealed session blob
    pub storage_key: String,
    /// Directory for the session blob and generated key (default: ~/.blogdesk)
    pub data_dir: PathBuf,
    /// Blog API base URL (default: http://localhost:8000)
    pub api_base_url: String,
    /// Renewal endpoint path (default: /auth/refresh)
    pub refresh_path: String,
    /// Include the decoded subject in renewal requests
    pub send_subject: bool,
    /// Secret for the session key; a generated key file is used when unset
    pub session_secret: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            renewal_skew: Duration::from_secs(5 * 60),
            check_interval: Duration::from_secs(4 * 60),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir: default_data_dir(),
            api_base_url: DEFAULT_API_URL.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            send_subject: false,
            session_secret: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renewal_skew(mut self, skew: Duration) -> Self {
        self.renewal_skew = skew;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_send_subject(mut self, send: bool) -> Self {
        self.send_subject = send;
        self
    }

    pub fn with_session_secret(mut self, secret: impl Into<String>) -> Self {
        self.session_secret = Some(secret.into());
        self
    }

    /// Defaults overlaid with `BLOGDESK_*` environment variables.
    ///
    /// Unparseable numeric values are ignored with a warning. Zero
    /// durations are rejected the same way.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(skew) = env_secs(ENV_RENEWAL_SKEW) {
            config.renewal_skew = skew;
        }
        if let Some(interval) = env_secs(ENV_CHECK_INTERVAL) {
            config.check_interval = interval;
        }
        if let Some(dir) = env_nonempty(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = env_nonempty(ENV_API_URL) {
            config.api_base_url = url;
        }
        if let Some(flag) = env_nonempty(ENV_SEND_SUBJECT) {
            config.send_subject = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Some(secret) = env_nonempty(ENV_SESSION_KEY) {
            config.session_secret = Some(secret);
        }

        config
    }

    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join(KEY_FILE)
    }

    /// Resolve the key that seals the persisted session.
    ///
    /// Uses `session_secret` when set, otherwise loads (or creates) the key
    /// file under `data_dir`.
    pub fn session_key(&self) -> Result<SessionKey, SessionSetupError> {
        match &self.session_secret {
            Some(secret) => SessionKey::from_secret(secret),
            None => SessionKey::load_or_create(&self.key_path()),
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("renewal_skew", &self.renewal_skew)
            .field("check_interval", &self.check_interval)
            .field("storage_key", &self.storage_key)
            .field("data_dir", &self.data_dir)
            .field("api_base_url", &self.api_base_url)
            .field("refresh_path", &self.refresh_path)
            .field("send_subject", &self.send_subject)
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR))
        .unwrap_or_else(|| Path::new(DATA_DIR).to_path_buf())
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(name: &str) -> Option<Duration> {
    let raw = env_nonempty(name)?;
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            tracing::warn!("Ignoring {}=0", name);
            None
        }
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            tracing::warn!("Ignoring non-numeric {}={}", name, raw);
            None
        }
    }
}
