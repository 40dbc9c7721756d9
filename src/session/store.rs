//! In-memory holder of the current credential.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use super::SessionBroadcaster;
use crate::auth::Credential;

/// Holds at most one credential.
///
/// Values are swapped as whole `Arc`s, so a reader either sees the old
/// credential or the new one. Every change is published on the
/// broadcaster while the write lock is still held, which keeps the
/// published order identical to the store order.
#[derive(Debug)]
pub struct CredentialStore {
    current: RwLock<Option<Arc<Credential>>>,
    broadcaster: Arc<SessionBroadcaster>,
}

impl CredentialStore {
    pub fn new(broadcaster: Arc<SessionBroadcaster>) -> Self {
        Self {
            current: RwLock::new(None),
            broadcaster,
        }
    }

    pub fn current(&self) -> Option<Arc<Credential>> {
        self.current.read().clone()
    }

    /// Replace the current credential.
    pub fn set(&self, credential: Credential) -> Arc<Credential> {
        let credential = Arc::new(credential);
        let mut current = self.current.write();
        *current = Some(Arc::clone(&credential));
        self.broadcaster.publish(Some(credential.identity()));
        credential
    }

    /// Drop the current credential and publish the logged-out signal.
    pub fn clear(&self) {
        let mut current = self.current.write();
        *current = None;
        self.broadcaster.publish(None);
    }

    /// True when absent, or when remaining validity is at or below `skew`.
    pub fn is_expiring_soon(&self, skew: Duration) -> bool {
        match self.current() {
            Some(credential) => credential.is_expiring_soon(skew),
            None => true,
        }
    }

    /// Replace the credential only if `expected` is still the current one.
    ///
    /// Returns `None` when the session changed in the meantime (logout or
    /// a new login); `next` is dropped in that case.
    pub fn replace_if_current(
        &self,
        expected: &Arc<Credential>,
        next: Credential,
    ) -> Option<Arc<Credential>> {
        let mut current = self.current.write();
        match current.as_ref() {
            Some(held) if Arc::ptr_eq(held, expected) => {
                let next = Arc::new(next);
                *current = Some(Arc::clone(&next));
                self.broadcaster.publish(Some(next.identity()));
                Some(next)
            }
            _ => None,
        }
    }

    /// Clear the credential only if `expected` is still the current one.
    ///
    /// Returns whether anything was cleared.
    pub fn clear_if_current(&self, expected: &Arc<Credential>) -> bool {
        let mut current = self.current.write();
        match current.as_ref() {
            Some(held) if Arc::ptr_eq(held, expected) => {
                *current = None;
                self.broadcaster.publish(None);
                true
            }
            _ => false,
        }
    }

    pub fn broadcaster(&self) -> &Arc<SessionBroadcaster> {
        &self.broadcaster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn credential(minutes: i64) -> Credential {
        Credential {
            access_token: format!("access-{}", minutes),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + ChronoDuration::minutes(minutes),
            subject: "42".to_string(),
            profile: None,
        }
    }

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(SessionBroadcaster::new()))
    }

    #[test]
    fn test_set_and_clear_publish() {
        let store = store();
        assert!(store.current().is_none());

        store.set(credential(30));
        assert_eq!(store.current().unwrap().access_token, "access-30");
        assert_eq!(store.broadcaster().latest().unwrap().subject, "42");

        store.clear();
        assert!(store.current().is_none());
        assert_eq!(store.broadcaster().latest(), None);
        assert_eq!(store.broadcaster().emissions(), 2);
    }

    #[test]
    fn test_is_expiring_soon() {
        let store = store();
        let skew = Duration::from_secs(300);
        assert!(store.is_expiring_soon(skew));

        store.set(credential(30));
        assert!(!store.is_expiring_soon(skew));

        store.set(credential(2));
        assert!(store.is_expiring_soon(skew));
    }

    #[test]
    fn test_replace_if_current() {
        let store = store();
        let first = store.set(credential(2));

        let second = store.replace_if_current(&first, credential(30)).unwrap();
        assert_eq!(store.current().unwrap().access_token, "access-30");

        // `first` is stale now.
        assert!(store.replace_if_current(&first, credential(60)).is_none());
        assert!(Arc::ptr_eq(&store.current().unwrap(), &second));
    }

    #[test]
    fn test_clear_if_current_ignores_stale() {
        let store = store();
        let first = store.set(credential(2));
        let second = store.set(credential(30));
        let emissions = store.broadcaster().emissions();

        assert!(!store.clear_if_current(&first));
        assert!(store.current().is_some());
        assert_eq!(store.broadcaster().emissions(), emissions);

        assert!(store.clear_if_current(&second));
        assert!(store.current().is_none());
    }

    #[test]
    fn test_cas_after_clear_does_nothing() {
        let store = store();
        let first = store.set(credential(2));
        store.clear();

        assert!(store.replace_if_current(&first, credential(30)).is_none());
        assert!(!store.clear_if_current(&first));
        assert!(store.current().is_none());
    }
}
