//! Single-flight credential renewal.
//!
//! [`RenewalCoordinator::ensure_fresh`] is the only way a credential gets
//! renewed. Callers that arrive while a renewal is pending await the same
//! shared future and all receive its outcome, so the server sees one
//! refresh request no matter how many requests noticed the expiry.
//!
//! The renewal runs on its own tokio task. Dropping a waiting caller does
//! not cancel it.
//!
//! # Outcomes
//!
//! - Success: the successor credential replaces the one that was renewed,
//!   then it is persisted (persistence failures are logged only).
//! - Failure: the renewed credential is cleared and the stored blob wiped.
//!
//! Both writes are compare-and-swap against the credential the renewal
//! started from. A renewal that finishes after a logout or a new login
//! leaves the session it finds alone, and callers holding the newer
//! session never join it: the pending slot is keyed by the credential
//! being renewed.

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::{CredentialStore, PersistenceGateway};
use crate::auth::Credential;
use crate::error::AuthError;
use crate::traits::{RenewalEndpoint, RenewalRequest};

type PendingRenewal = Shared<BoxFuture<'static, Result<Arc<Credential>, AuthError>>>;

/// The credential being renewed, paired with its renewal.
type PendingSlot = Option<(Arc<Credential>, PendingRenewal)>;

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalState {
    Idle,
    Renewing,
    /// Transient; reset to `Idle` as soon as teardown has finished.
    Failed,
}

struct Inner {
    store: Arc<CredentialStore>,
    persistence: Arc<PersistenceGateway>,
    endpoint: Arc<dyn RenewalEndpoint>,
    skew: Duration,
    pending: Mutex<PendingSlot>,
    state: Mutex<RenewalState>,
}

/// Renews the current credential at most once at a time.
///
/// Cheap to clone; clones share the pending slot.
#[derive(Clone)]
pub struct RenewalCoordinator {
    inner: Arc<Inner>,
}

impl RenewalCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        persistence: Arc<PersistenceGateway>,
        endpoint: Arc<dyn RenewalEndpoint>,
        skew: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                persistence,
                endpoint,
                skew,
                pending: Mutex::new(None),
                state: Mutex::new(RenewalState::Idle),
            }),
        }
    }

    pub fn state(&self) -> RenewalState {
        *self.inner.state.lock()
    }

    pub fn skew(&self) -> Duration {
        self.inner.skew
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.inner.store
    }

    /// True while a renewal is pending.
    pub fn is_renewing(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    /// Return a credential that is not expiring soon, renewing if needed.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Every error means the session is gone and the user must sign in
    /// again.
    pub async fn ensure_fresh(&self) -> Result<Arc<Credential>, AuthError> {
        loop {
            let current = self
                .inner
                .store
                .current()
                .ok_or(AuthError::NotAuthenticated)?;
            if !current.is_expiring_soon(self.inner.skew) {
                return Ok(current);
            }

            let renewal = self.join_or_spawn(&current);
            match renewal.await {
                Ok(next) if self.is_current(&next) => return Ok(next),
                Ok(_) => {}
                Err(e) if !self.was_superseded(&current) => return Err(e),
                Err(_) => {}
            }
            // The session changed while the renewal was in flight; check
            // whichever credential is current now.
            tracing::debug!("Renewed credential was superseded, re-checking");
        }
    }

    /// Join the pending renewal of `current`, or start one.
    ///
    /// A pending renewal of any other credential is left to finish on its
    /// own and never joined.
    fn join_or_spawn(&self, current: &Arc<Credential>) -> PendingRenewal {
        let mut pending = self.inner.pending.lock();
        if let Some((renewing, renewal)) = pending.as_ref() {
            if Arc::ptr_eq(renewing, current) {
                tracing::debug!("Joining pending credential renewal");
                return renewal.clone();
            }
        }
        let renewal = self.spawn_renewal(Arc::clone(current));
        *pending = Some((Arc::clone(current), renewal.clone()));
        renewal
    }

    fn is_current(&self, credential: &Arc<Credential>) -> bool {
        self.inner
            .store
            .current()
            .is_some_and(|current| Arc::ptr_eq(&current, credential))
    }

    /// True when the store holds a credential other than `renewed`.
    fn was_superseded(&self, renewed: &Arc<Credential>) -> bool {
        self.inner
            .store
            .current()
            .is_some_and(|current| !Arc::ptr_eq(&current, renewed))
    }

    /// Start the renewal task. Called with the pending slot locked.
    fn spawn_renewal(&self, current: Arc<Credential>) -> PendingRenewal {
        *self.inner.state.lock() = RenewalState::Renewing;
        tracing::debug!(
            "Renewing credential for {} ({}s remaining)",
            current.subject,
            current.seconds_remaining()
        );

        let task = tokio::spawn(run_renewal(Arc::clone(&self.inner), current));
        async move {
            task.await.unwrap_or_else(|e| {
                Err(AuthError::RefreshFailed {
                    message: format!("renewal task ended unexpectedly: {}", e),
                })
            })
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for RenewalCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewalCoordinator")
            .field("state", &self.state())
            .field("skew", &self.inner.skew)
            .finish_non_exhaustive()
    }
}

async fn run_renewal(
    inner: Arc<Inner>,
    current: Arc<Credential>,
) -> Result<Arc<Credential>, AuthError> {
    let outcome = match request_successor(&inner, &current).await {
        Ok(next) => commit(&inner, &current, next),
        Err(e) => {
            if owns_slot(&inner.pending.lock(), &current) {
                *inner.state.lock() = RenewalState::Failed;
            }
            tear_down(&inner, &current, &e);
            Err(e)
        }
    };

    // A renewal of a newer credential may hold the slot by now.
    let mut pending = inner.pending.lock();
    if owns_slot(&pending, &current) {
        *pending = None;
        *inner.state.lock() = RenewalState::Idle;
    }
    outcome
}

fn owns_slot(pending: &PendingSlot, credential: &Arc<Credential>) -> bool {
    pending
        .as_ref()
        .is_some_and(|(renewing, _)| Arc::ptr_eq(renewing, credential))
}

async fn request_successor(inner: &Inner, current: &Credential) -> Result<Credential, AuthError> {
    let refresh_token = current
        .refresh_token
        .clone()
        .ok_or(AuthError::RefreshTokenMissing)?;

    let request = RenewalRequest {
        refresh_token,
        subject: Some(current.subject.clone()),
    };
    let grant = inner.endpoint.renew(&request).await?;
    let next = current.renewed(grant, Utc::now())?;

    if next.expires_at <= current.expires_at {
        return Err(AuthError::ExpiryNotIncreasing {
            previous: current.expires_at.timestamp(),
            received: next.expires_at.timestamp(),
        });
    }
    Ok(next)
}

fn commit(
    inner: &Inner,
    current: &Arc<Credential>,
    next: Credential,
) -> Result<Arc<Credential>, AuthError> {
    match inner.store.replace_if_current(current, next) {
        Some(next) => {
            if let Err(e) = inner.persistence.save(&next) {
                tracing::warn!("Failed to persist renewed session: {}", e);
            }
            tracing::info!(
                "Renewed credential for {} (expires {})",
                next.subject,
                next.expires_at
            );
            Ok(next)
        }
        None => {
            tracing::warn!("Session changed during renewal, discarding renewed credential");
            Err(AuthError::NotAuthenticated)
        }
    }
}

fn tear_down(inner: &Inner, current: &Arc<Credential>, error: &AuthError) {
    tracing::warn!("Credential renewal failed, signing out: {}", error);
    if inner.store.clear_if_current(current) {
        if let Err(e) = inner.persistence.wipe() {
            tracing::warn!("Failed to wipe persisted session: {}", e);
        }
    } else {
        tracing::debug!("Session already replaced, leaving it in place");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemoryStorage, MockRenewalEndpoint};
    use crate::auth::{CredentialCodec, SessionKey};
    use crate::session::{SessionBroadcaster, DEFAULT_STORAGE_KEY};
    use crate::traits::RenewalGrant;
    use chrono::Duration as ChronoDuration;

    const SKEW: Duration = Duration::from_secs(300);

    struct Fixture {
        storage: InMemoryStorage,
        endpoint: MockRenewalEndpoint,
        store: Arc<CredentialStore>,
        coordinator: RenewalCoordinator,
    }

    fn fixture(endpoint: MockRenewalEndpoint) -> Fixture {
        let storage = InMemoryStorage::new();
        let store = Arc::new(CredentialStore::new(Arc::new(SessionBroadcaster::new())));
        let codec = CredentialCodec::new(&SessionKey::from_bytes([3u8; 32]));
        let persistence = Arc::new(PersistenceGateway::new(
            Arc::new(storage.clone()),
            codec,
            DEFAULT_STORAGE_KEY,
        ));
        let coordinator = RenewalCoordinator::new(
            Arc::clone(&store),
            persistence,
            Arc::new(endpoint.clone()),
            SKEW,
        );
        Fixture {
            storage,
            endpoint,
            store,
            coordinator,
        }
    }

    fn credential(minutes: i64, refresh: Option<&str>) -> Credential {
        Credential {
            access_token: "old-access".to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Utc::now() + ChronoDuration::minutes(minutes),
            subject: "42".to_string(),
            profile: None,
        }
    }

    fn grant_for(minutes: u64) -> RenewalGrant {
        RenewalGrant {
            access_token: "opaque-new-access".to_string(),
            refresh_token: None,
            expires_in: Some(minutes * 60),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_absent_is_not_authenticated() {
        let f = fixture(MockRenewalEndpoint::new());
        assert_eq!(
            f.coordinator.ensure_fresh().await.unwrap_err(),
            AuthError::NotAuthenticated
        );
        assert_eq!(f.endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn test_fresh_credential_skips_network() {
        let f = fixture(MockRenewalEndpoint::new());
        let stored = f.store.set(credential(30, Some("r")));

        let result = f.coordinator.ensure_fresh().await.unwrap();
        assert!(Arc::ptr_eq(&result, &stored));
        assert_eq!(f.endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn test_renewal_replaces_and_persists() {
        let f = fixture(MockRenewalEndpoint::granting(grant_for(30)));
        f.store.set(credential(2, Some("r")));

        let renewed = f.coordinator.ensure_fresh().await.unwrap();
        assert_eq!(renewed.access_token, "opaque-new-access");
        assert_eq!(renewed.refresh_token.as_deref(), Some("r"));
        assert_eq!(f.store.current().unwrap().access_token, "opaque-new-access");
        assert!(f.storage.raw(DEFAULT_STORAGE_KEY).is_some());
        assert_eq!(f.coordinator.state(), RenewalState::Idle);
        assert!(!f.coordinator.is_renewing());

        let request = &f.endpoint.requests()[0];
        assert_eq!(request.refresh_token, "r");
        assert_eq!(request.subject.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_tears_down() {
        let f = fixture(MockRenewalEndpoint::granting(grant_for(30)));
        f.store.set(credential(2, None));
        f.storage.insert_raw(DEFAULT_STORAGE_KEY, "stale");

        let err = f.coordinator.ensure_fresh().await.unwrap_err();
        assert_eq!(err, AuthError::RefreshTokenMissing);
        assert!(f.store.current().is_none());
        assert!(f.storage.raw(DEFAULT_STORAGE_KEY).is_none());
        assert_eq!(f.endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_increasing_expiry_is_rejected() {
        let f = fixture(MockRenewalEndpoint::granting(grant_for(1)));
        f.store.set(credential(2, Some("r")));

        let err = f.coordinator.ensure_fresh().await.unwrap_err();
        assert!(matches!(err, AuthError::ExpiryNotIncreasing { .. }));
        assert!(f.store.current().is_none());
        assert_eq!(f.coordinator.state(), RenewalState::Idle);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_renewal() {
        let endpoint = MockRenewalEndpoint::granting(grant_for(30));
        endpoint.set_delay(Duration::from_millis(20));
        let f = fixture(endpoint);
        f.store.set(credential(2, Some("r")));

        let results =
            futures::future::join_all((0..8).map(|_| f.coordinator.ensure_fresh())).await;

        assert_eq!(f.endpoint.calls(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(result.as_ref().unwrap(), first));
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_failure() {
        let endpoint = MockRenewalEndpoint::rejecting();
        endpoint.set_delay(Duration::from_millis(20));
        let f = fixture(endpoint);
        f.store.set(credential(2, Some("r")));

        let results =
            futures::future::join_all((0..4).map(|_| f.coordinator.ensure_fresh())).await;

        assert_eq!(f.endpoint.calls(), 1);
        for result in results {
            assert!(matches!(result, Err(AuthError::RefreshRejected { status: 401, .. })));
        }
    }

    #[tokio::test]
    async fn test_renewal_after_clear_does_not_restore() {
        let endpoint = MockRenewalEndpoint::granting(grant_for(30));
        endpoint.hold();
        let f = fixture(endpoint);
        f.store.set(credential(2, Some("r")));

        let waiter = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.ensure_fresh().await })
        };
        while f.endpoint.calls() == 0 {
            tokio::task::yield_now().await;
        }

        f.store.clear();
        f.endpoint.release();

        assert_eq!(waiter.await.unwrap().unwrap_err(), AuthError::NotAuthenticated);
        assert!(f.store.current().is_none());
        assert!(f.storage.raw(DEFAULT_STORAGE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_failed_renewal_keeps_newer_session() {
        let endpoint = MockRenewalEndpoint::rejecting();
        endpoint.hold();
        let f = fixture(endpoint);
        f.store.set(credential(2, Some("r")));

        let waiter = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.ensure_fresh().await })
        };
        while f.endpoint.calls() == 0 {
            tokio::task::yield_now().await;
        }

        let newer = f.store.set(credential(60, Some("r2")));
        f.endpoint.release();

        // The waiter's session was replaced by a fresh one, which it gets.
        let result = waiter.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&result, &newer));
        assert!(Arc::ptr_eq(&f.store.current().unwrap(), &newer));
        assert_eq!(f.endpoint.calls(), 1);
    }

    fn other_session(minutes: i64, refresh: &str) -> Credential {
        Credential {
            access_token: "other-access".to_string(),
            subject: "43".to_string(),
            ..credential(minutes, Some(refresh))
        }
    }

    async fn wait_for_calls(endpoint: &MockRenewalEndpoint, calls: usize) {
        while endpoint.calls() < calls {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_new_session_does_not_join_older_failing_renewal() {
        let endpoint = MockRenewalEndpoint::granting(grant_for(30));
        endpoint.respond_to(
            "old",
            Err(AuthError::RefreshRejected {
                status: 401,
                message: "revoked".to_string(),
            }),
        );
        endpoint.hold();
        let f = fixture(endpoint);
        f.store.set(credential(2, Some("old")));

        let first = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.ensure_fresh().await })
        };
        wait_for_calls(&f.endpoint, 1).await;

        f.store.set(other_session(2, "new"));
        let second = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.ensure_fresh().await })
        };
        wait_for_calls(&f.endpoint, 2).await;
        f.endpoint.release();

        let renewed = second.await.unwrap().unwrap();
        assert_eq!(renewed.subject, "43");
        assert_eq!(renewed.access_token, "opaque-new-access");
        assert!(!renewed.is_expiring_soon(SKEW));
        assert!(Arc::ptr_eq(&f.store.current().unwrap(), &renewed));

        // The older caller ends up on the session that replaced its own.
        let first = first.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &renewed));

        let tokens: Vec<_> = f
            .endpoint
            .requests()
            .into_iter()
            .map(|r| r.refresh_token)
            .collect();
        assert_eq!(tokens, vec!["old".to_string(), "new".to_string()]);
        assert!(f.storage.raw(DEFAULT_STORAGE_KEY).is_some());
        assert!(!f.coordinator.is_renewing());
        assert_eq!(f.coordinator.state(), RenewalState::Idle);
    }

    #[tokio::test]
    async fn test_new_session_does_not_take_older_renewal_result() {
        let endpoint = MockRenewalEndpoint::granting(grant_for(30));
        endpoint.hold();
        let f = fixture(endpoint);
        f.store.set(credential(2, Some("old")));

        let first = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.ensure_fresh().await })
        };
        wait_for_calls(&f.endpoint, 1).await;

        let newer = f.store.set(other_session(2, "new"));
        let second = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move { coordinator.ensure_fresh().await })
        };
        wait_for_calls(&f.endpoint, 2).await;
        f.endpoint.release();

        let renewed = second.await.unwrap().unwrap();
        assert!(!Arc::ptr_eq(&renewed, &newer));
        assert_eq!(renewed.subject, "43");
        assert!(!renewed.is_expiring_soon(SKEW));
        assert_eq!(f.endpoint.requests()[1].refresh_token, "new");

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.subject, "43");
        assert!(!first.is_expiring_soon(SKEW));
        assert_eq!(f.endpoint.calls(), 2);
    }
}
