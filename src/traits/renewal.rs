//! Renewal endpoint trait abstraction.
//!
//! The session coordinator only needs one network operation: trade a
//! refresh token for a new access token. Production code talks HTTP through
//! [`crate::auth::AuthApiClient`]; tests use
//! [`crate::adapters::mock::MockRenewalEndpoint`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Request sent to the renewal endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalRequest {
    pub refresh_token: String,
    /// Decoded subject, sent only in deployments that ask for it.
    pub subject: Option<String>,
}

/// Successful renewal response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenewalGrant {
    #[serde(alias = "access")]
    pub access_token: String,
    /// Present when the server rotates refresh tokens.
    #[serde(default, alias = "refresh")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds; only used when the token's own `exp` is unreadable.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl RenewalGrant {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            user_id: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// Trait for the credential renewal network call.
///
/// Implementations map every non-success outcome onto an [`AuthError`]:
/// rejected refresh tokens to `RefreshRejected`, transport and server
/// failures to `RefreshFailed`, unusable bodies to `InvalidResponse`.
#[async_trait]
pub trait RenewalEndpoint: Send + Sync {
    async fn renew(&self, request: &RenewalRequest) -> Result<RenewalGrant, AuthError>;
}
