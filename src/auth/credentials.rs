//! Credential model for blogdesk sessions.
//!
//! A [`Credential`] is the bearer access token, the refresh token, and the
//! expiry and subject derived from the access token, treated as one unit.
//! Readers always get an `Arc<Credential>`; a renewal builds a new value and
//! swaps it in, it never edits one in place.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::codec;
use crate::error::AuthError;
use crate::traits::RenewalGrant;

/// Upper bound for a server-supplied `expires_in` (ten years).
const MAX_EXPIRES_IN_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Last known profile of the signed-in user.
///
/// Display-only. Nothing in the session subsystem makes authorization
/// decisions from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }
}

/// What the rest of the application is allowed to know about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub subject: String,
    pub profile: Option<UserProfile>,
}

/// Authentication credential for the blog API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Credential {
    /// Bearer value presented on outgoing requests.
    pub access_token: String,
    /// Longer-lived value used only to obtain a new access token.
    pub refresh_token: Option<String>,
    /// Expiry hint decoded from the access token.
    pub expires_at: DateTime<Utc>,
    /// User identity associated with the credential.
    pub subject: String,
    /// Display-only profile snapshot.
    pub profile: Option<UserProfile>,
}

impl Credential {
    /// Build a credential from freshly issued tokens.
    ///
    /// The subject comes from the token's claims, falling back to
    /// `subject_hint`. An access token without a readable `exp` yields a
    /// credential that is already expired.
    pub fn from_tokens(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        subject_hint: Option<String>,
        profile: Option<UserProfile>,
    ) -> Result<Self, AuthError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(AuthError::InvalidCredentials {
                message: "access token is empty".to_string(),
            });
        }

        let expires_at = codec::decode_expiry(&access_token).unwrap_or_else(|e| {
            tracing::debug!("Access token expiry unreadable, treating as expired: {}", e);
            expired_sentinel()
        });

        let subject = codec::decode_subject(&access_token)
            .ok()
            .or(subject_hint)
            .ok_or_else(|| AuthError::InvalidCredentials {
                message: "no subject in token and none supplied".to_string(),
            })?;

        Ok(Self {
            access_token,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            subject,
            profile,
        })
    }

    /// Build the successor of `self` from a renewal response.
    ///
    /// Keeps the current refresh token unless the server rotated it, and
    /// keeps the subject and profile unless the new token says otherwise.
    pub fn renewed(&self, grant: RenewalGrant, now: DateTime<Utc>) -> Result<Self, AuthError> {
        if grant.access_token.trim().is_empty() {
            return Err(AuthError::InvalidResponse {
                message: "empty access token".to_string(),
            });
        }

        let expires_at = match codec::decode_expiry(&grant.access_token) {
            Ok(at) => at,
            Err(e) => match grant.expires_in {
                Some(secs) => now + Duration::seconds(secs.min(MAX_EXPIRES_IN_SECS) as i64),
                None => {
                    return Err(AuthError::InvalidResponse {
                        message: format!("renewed token has no usable expiry: {}", e),
                    })
                }
            },
        };

        let subject = codec::decode_subject(&grant.access_token)
            .ok()
            .or(grant.user_id)
            .unwrap_or_else(|| self.subject.clone());

        Ok(Self {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .filter(|t| !t.is_empty())
                .or_else(|| self.refresh_token.clone()),
            expires_at,
            subject,
            profile: self.profile.clone(),
        })
    }

    /// Check if the credential can be renewed at all.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Check if the credential is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if the remaining validity is at or below `skew`.
    pub fn is_expiring_soon(&self, skew: std::time::Duration) -> bool {
        self.is_expiring_soon_at(skew, Utc::now())
    }

    pub fn is_expiring_soon_at(&self, skew: std::time::Duration, now: DateTime<Utc>) -> bool {
        let skew = Duration::from_std(skew).unwrap_or_else(|_| Duration::weeks(52 * 100));
        self.expires_at - now <= skew
    }

    /// Seconds of validity left, negative once expired.
    pub fn seconds_remaining(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }

    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            subject: self.subject.clone(),
            profile: self.profile.clone(),
        }
    }
}

fn expired_sentinel() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}
