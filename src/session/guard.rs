//! Load-time verification and the pre-request hook.

use std::sync::Arc;

use super::{CredentialStore, PersistenceGateway, RenewalCoordinator};
use crate::auth::Credential;
use crate::error::AuthError;

/// Gatekeeper used at startup and before authenticated requests.
#[derive(Debug, Clone)]
pub struct ReactiveGuard {
    store: Arc<CredentialStore>,
    persistence: Arc<PersistenceGateway>,
    coordinator: RenewalCoordinator,
}

impl ReactiveGuard {
    pub fn new(
        store: Arc<CredentialStore>,
        persistence: Arc<PersistenceGateway>,
        coordinator: RenewalCoordinator,
    ) -> Self {
        Self {
            store,
            persistence,
            coordinator,
        }
    }

    /// Rehydrate the session from storage.
    ///
    /// A session already in memory is kept as is and storage is not read.
    /// A credential that is expiring soon is renewed before this returns.
    /// `None` means the application starts signed out.
    pub async fn verify_on_load(&self) -> Option<Arc<Credential>> {
        let credential = match self.store.current() {
            Some(credential) => credential,
            None => self.store.set(self.persistence.load()?),
        };

        if !credential.is_expiring_soon(self.coordinator.skew()) {
            tracing::info!("Restored session for {}", credential.subject);
            return Some(credential);
        }

        match self.coordinator.ensure_fresh().await {
            Ok(credential) => {
                tracing::info!("Restored and renewed session for {}", credential.subject);
                Some(credential)
            }
            Err(e) => {
                tracing::info!("Persisted session could not be renewed: {}", e);
                None
            }
        }
    }

    /// Call before dispatching any request that needs authentication.
    pub async fn verify_before_sensitive_action(&self) -> Result<Arc<Credential>, AuthError> {
        self.coordinator.ensure_fresh().await
    }
}
