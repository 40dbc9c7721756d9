//! Mock implementations for test fixtures.
//!
//! This module re-exports the mock implementations from
//! `blogdesk::adapters::mock` and provides renewal grant builders.

pub use blogdesk::adapters::mock::{InMemoryStorage, MockRenewalEndpoint};
pub use blogdesk::traits::RenewalGrant;

use super::token_expiring_in;

/// Grant carrying a token that expires `secs` seconds from now.
pub fn grant_expiring_in(secs: i64) -> RenewalGrant {
    RenewalGrant::new(token_expiring_in(secs, "42"))
}

/// Grant that also rotates the refresh token.
pub fn rotating_grant(secs: i64, refresh: &str) -> RenewalGrant {
    grant_expiring_in(secs).with_refresh_token(refresh)
}
