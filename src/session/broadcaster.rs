//! Latest-value session signal for the rest of the application.
//!
//! The slot holds `Some(identity)` while signed in and `None` once logged
//! out. Only [`super::CredentialStore`] publishes, so every subscriber sees
//! the same order of transitions.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::auth::SessionIdentity;

/// Single observable slot carrying the current session identity.
#[derive(Debug)]
pub struct SessionBroadcaster {
    slot: watch::Sender<Option<SessionIdentity>>,
    emissions: AtomicU64,
}

impl SessionBroadcaster {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot,
            emissions: AtomicU64::new(0),
        }
    }

    /// Replace the slot value and notify subscribers.
    ///
    /// Succeeds with no subscribers attached.
    pub fn publish(&self, identity: Option<SessionIdentity>) {
        match &identity {
            Some(identity) => tracing::debug!("Publishing session for {}", identity.subject),
            None => tracing::debug!("Publishing logged-out session"),
        }
        self.slot.send_replace(identity);
        self.emissions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>> {
        self.slot.subscribe()
    }

    pub fn latest(&self) -> Option<SessionIdentity> {
        self.slot.borrow().clone()
    }

    /// Number of values published since construction.
    pub fn emissions(&self) -> u64 {
        self.emissions.load(Ordering::SeqCst)
    }
}

impl Default for SessionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
