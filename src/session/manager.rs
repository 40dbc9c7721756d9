//! Session facade used by the rest of the application.

use std::sync::Arc;
use tokio::sync::watch;

use super::{
    BackgroundScheduler, CredentialStore, PersistenceGateway, ReactiveGuard, RenewalCoordinator,
    SessionBroadcaster,
};
use crate::adapters::FileStorage;
use crate::auth::{
    AuthApiClient, Credential, CredentialCodec, SessionIdentity, SessionKey, UserProfile,
};
use crate::config::{SessionConfig, KEY_FILE};
use crate::error::{AuthError, SessionSetupError, StorageError};
use crate::traits::{KeyValueStorage, RenewalEndpoint};

/// Owns every session component and wires them together.
///
/// Dropping the manager stops the background scheduler.
#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    broadcaster: Arc<SessionBroadcaster>,
    store: Arc<CredentialStore>,
    persistence: Arc<PersistenceGateway>,
    coordinator: RenewalCoordinator,
    guard: ReactiveGuard,
    scheduler: BackgroundScheduler,
}

impl SessionManager {
    /// Build a manager, resolving the session key from `config`.
    ///
    /// The storage key may not name the key file, which shares the data
    /// directory.
    pub fn new(
        config: SessionConfig,
        storage: Arc<dyn KeyValueStorage>,
        endpoint: Arc<dyn RenewalEndpoint>,
    ) -> Result<Self, SessionSetupError> {
        if config.storage_key == KEY_FILE {
            return Err(StorageError::InvalidKey(config.storage_key).into());
        }
        let key = config.session_key()?;
        Ok(Self::with_key(config, key, storage, endpoint))
    }

    /// Build a manager with file storage under `data_dir` and the HTTP
    /// renewal endpoint.
    pub fn from_config(config: SessionConfig) -> Result<Self, SessionSetupError> {
        let storage = Arc::new(FileStorage::with_path(config.data_dir.clone()));
        let endpoint = Arc::new(
            AuthApiClient::new(config.api_base_url.clone())
                .with_refresh_path(config.refresh_path.clone())
                .with_send_subject(config.send_subject),
        );
        Self::new(config, storage, endpoint)
    }

    pub fn with_key(
        config: SessionConfig,
        key: SessionKey,
        storage: Arc<dyn KeyValueStorage>,
        endpoint: Arc<dyn RenewalEndpoint>,
    ) -> Self {
        let broadcaster = Arc::new(SessionBroadcaster::new());
        let store = Arc::new(CredentialStore::new(Arc::clone(&broadcaster)));
        let persistence = Arc::new(PersistenceGateway::new(
            storage,
            CredentialCodec::new(&key),
            config.storage_key.clone(),
        ));
        let coordinator = RenewalCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&persistence),
            endpoint,
            config.renewal_skew,
        );
        let guard = ReactiveGuard::new(
            Arc::clone(&store),
            Arc::clone(&persistence),
            coordinator.clone(),
        );
        let scheduler = BackgroundScheduler::new(coordinator.clone(), config.check_interval);

        Self {
            config,
            broadcaster,
            store,
            persistence,
            coordinator,
            guard,
            scheduler,
        }
    }

    /// Install freshly issued tokens as the current session.
    ///
    /// Persists the credential and starts the background scheduler, so it
    /// must be called from within a tokio runtime. A failed write is
    /// logged; the in-memory session still stands.
    pub fn login(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        subject_hint: Option<String>,
        profile: Option<UserProfile>,
    ) -> Result<Arc<Credential>, AuthError> {
        let credential =
            Credential::from_tokens(access_token, refresh_token, subject_hint, profile)?;
        let credential = self.store.set(credential);

        if let Err(e) = self.persistence.save(&credential) {
            tracing::warn!("Failed to persist session: {}", e);
        }
        self.scheduler.start();

        tracing::info!(
            "Signed in as {} (expires {})",
            credential.subject,
            credential.expires_at
        );
        Ok(credential)
    }

    /// Stop the scheduler, drop the credential, wipe storage.
    ///
    /// The in-memory session is gone even when the wipe fails.
    pub fn logout(&self) -> Result<(), StorageError> {
        self.scheduler.stop();
        self.store.clear();
        let wiped = self.persistence.wipe();
        match &wiped {
            Ok(()) => tracing::info!("Signed out"),
            Err(e) => tracing::warn!("Signed out, but failed to wipe persisted session: {}", e),
        }
        wiped
    }

    /// Restore the persisted session; starts the scheduler when one survives.
    pub async fn verify_on_load(&self) -> Option<Arc<Credential>> {
        let credential = self.guard.verify_on_load().await?;
        self.scheduler.start();
        Some(credential)
    }

    /// `Authorization` header value for an outgoing request.
    pub async fn authorization_header(&self) -> Result<String, AuthError> {
        let credential = self.guard.verify_before_sensitive_action().await?;
        Ok(format!("Bearer {}", credential.access_token))
    }

    pub fn current(&self) -> Option<Arc<Credential>> {
        self.store.current()
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.broadcaster.latest()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>> {
        self.broadcaster.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> &Arc<SessionBroadcaster> {
        &self.broadcaster
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn persistence(&self) -> &Arc<PersistenceGateway> {
        &self.persistence
    }

    pub fn coordinator(&self) -> &RenewalCoordinator {
        &self.coordinator
    }

    pub fn guard(&self) -> &ReactiveGuard {
        &self.guard
    }

    pub fn scheduler(&self) -> &BackgroundScheduler {
        &self.scheduler
    }
}
