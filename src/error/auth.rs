//! Authentication-related error types.
//!
//! Every variant here is an "unauthenticated" outcome from the caller's
//! point of view: the session is gone (or never existed) and the user has
//! to sign in again. The variants only differ in what went wrong, which is
//! useful for logs and for the message shown before redirecting to login.

use std::fmt;

/// Authentication-specific error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential is held (user not logged in, or already logged out).
    NotAuthenticated,

    /// The credential is expiring and carries no refresh value.
    RefreshTokenMissing,

    /// The renewal endpoint refused the refresh value.
    RefreshRejected { status: u16, message: String },

    /// The renewal call failed in transport or with a server error.
    RefreshFailed { message: String },

    /// The renewal endpoint answered with something we cannot use.
    InvalidResponse { message: String },

    /// The renewed credential does not expire later than the one it replaces.
    ExpiryNotIncreasing { previous: i64, received: i64 },

    /// Credential values supplied at login cannot form a session.
    InvalidCredentials { message: String },
}

impl AuthError {
    /// Check if this error requires the user to sign in again.
    ///
    /// Always true; kept as a method so collaborators can branch on it the
    /// same way they branch on their own error types.
    pub fn requires_reauth(&self) -> bool {
        true
    }

    /// Check if the failure came from the renewal endpoint itself.
    pub fn is_renewal_failure(&self) -> bool {
        matches!(
            self,
            AuthError::RefreshRejected { .. }
                | AuthError::RefreshFailed { .. }
                | AuthError::InvalidResponse { .. }
                | AuthError::ExpiryNotIncreasing { .. }
        )
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NotAuthenticated => {
                "You are not signed in. Please sign in to continue.".to_string()
            }
            AuthError::RefreshTokenMissing
            | AuthError::RefreshRejected { .. }
            | AuthError::ExpiryNotIncreasing { .. } => {
                "Your session could not be renewed. Please sign in again.".to_string()
            }
            AuthError::RefreshFailed { .. } | AuthError::InvalidResponse { .. } => {
                "Failed to renew your session. Please sign in again.".to_string()
            }
            AuthError::InvalidCredentials { .. } => {
                "Your credentials are invalid. Please sign in again.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "E_AUTH_NOT_AUTH",
            AuthError::RefreshTokenMissing => "E_AUTH_REFRESH_MISSING",
            AuthError::RefreshRejected { .. } => "E_AUTH_REFRESH_INV",
            AuthError::RefreshFailed { .. } => "E_AUTH_REFRESH_FAIL",
            AuthError::InvalidResponse { .. } => "E_AUTH_BAD_RESPONSE",
            AuthError::ExpiryNotIncreasing { .. } => "E_AUTH_EXPIRY_REGRESSED",
            AuthError::InvalidCredentials { .. } => "E_AUTH_INVALID",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NotAuthenticated => write!(f, "Not authenticated"),
            AuthError::RefreshTokenMissing => {
                write!(f, "Credential has no refresh token")
            }
            AuthError::RefreshRejected { status, message } => {
                write!(f, "Refresh token rejected ({}): {}", status, message)
            }
            AuthError::RefreshFailed { message } => {
                write!(f, "Token refresh failed: {}", message)
            }
            AuthError::InvalidResponse { message } => {
                write!(f, "Invalid renewal response: {}", message)
            }
            AuthError::ExpiryNotIncreasing { previous, received } => write!(
                f,
                "Renewed credential expires at {} which is not after {}",
                received, previous
            ),
            AuthError::InvalidCredentials { message } => {
                write!(f, "Invalid credentials: {}", message)
            }
        }
    }
}

impl std::error::Error for AuthError {}
