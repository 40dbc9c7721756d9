//! Common test utilities for integration tests.
//!
//! This module provides token builders, credential fixtures and a
//! ready-wired [`TestSession`] over the in-memory adapters.
//!
//! # Example
//!
//! ```ignore
//! let session = TestSession::new(MockRenewalEndpoint::granting(grant_expiring_in(1800)));
//! session.manager.login(token_expiring_in(120, "42"), Some("r".into()), None, None)?;
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use blogdesk::auth::{Credential, SessionKey};
use blogdesk::config::SessionConfig;
use blogdesk::session::SessionManager;

/// Fixed key so tests can inspect sealed blobs.
pub const TEST_KEY: [u8; 32] = [0x42; 32];

/// Build a three-segment bearer token with the given claims payload.
pub fn token_with_claims(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signature = URL_SAFE_NO_PAD.encode("not-verified");
    format!("{}.{}.{}", header, payload, signature)
}

/// Token for `user_id` expiring `secs` seconds from now.
pub fn token_expiring_in(secs: i64, user_id: &str) -> String {
    token_with_claims(serde_json::json!({
        "user_id": user_id,
        "exp": Utc::now().timestamp() + secs,
    }))
}

/// Credential built from a token expiring `secs` seconds from now.
pub fn credential_expiring_in(secs: i64, refresh: Option<&str>) -> Credential {
    Credential::from_tokens(
        token_expiring_in(secs, "42"),
        refresh.map(str::to_string),
        None,
        None,
    )
    .unwrap()
}

pub fn test_config() -> SessionConfig {
    SessionConfig::new()
        .with_renewal_skew(Duration::from_secs(5 * 60))
        .with_check_interval(Duration::from_secs(4 * 60))
}

/// Session manager over shared in-memory storage and a mock endpoint.
pub struct TestSession {
    pub manager: SessionManager,
    pub storage: InMemoryStorage,
    pub endpoint: MockRenewalEndpoint,
}

impl TestSession {
    pub fn new(endpoint: MockRenewalEndpoint) -> Self {
        Self::with_storage(InMemoryStorage::new(), endpoint)
    }

    pub fn with_storage(storage: InMemoryStorage, endpoint: MockRenewalEndpoint) -> Self {
        let manager = SessionManager::with_key(
            test_config(),
            SessionKey::from_bytes(TEST_KEY),
            Arc::new(storage.clone()),
            Arc::new(endpoint.clone()),
        );
        Self {
            manager,
            storage,
            endpoint,
        }
    }

    pub fn storage_key(&self) -> String {
        self.manager.config().storage_key.clone()
    }

    /// Raw sealed blob currently persisted, if any.
    pub fn persisted_blob(&self) -> Option<String> {
        self.storage.raw(&self.storage_key())
    }

    /// Decrypted persisted credential, if any.
    pub fn persisted_credential(&self) -> Option<Credential> {
        let codec = blogdesk::auth::CredentialCodec::new(&SessionKey::from_bytes(TEST_KEY));
        self.persisted_blob()
            .map(|blob| codec.deserialize(&blob).unwrap())
    }
}
