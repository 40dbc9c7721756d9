//! Session lifecycle.
//!
//! Components, leaves first:
//!
//! - [`SessionBroadcaster`] - latest `Option<SessionIdentity>` for the UI
//! - [`CredentialStore`] - the one current credential
//! - [`PersistenceGateway`] - sealed blob at a fixed storage key
//! - [`RenewalCoordinator`] - single-flight renewal
//! - [`BackgroundScheduler`] - periodic renewal check
//! - [`ReactiveGuard`] - startup rehydration and pre-request hook
//! - [`SessionManager`] - facade wiring the above together
//!
//! Only the store publishes on the broadcaster, and only the coordinator,
//! login and logout write the store.

pub mod broadcaster;
pub mod guard;
pub mod manager;
pub mod persistence;
pub mod renewal;
pub mod scheduler;
pub mod store;

pub use broadcaster::SessionBroadcaster;
pub use guard::ReactiveGuard;
pub use manager::SessionManager;
pub use persistence::{PersistenceGateway, DEFAULT_STORAGE_KEY};
pub use renewal::{RenewalCoordinator, RenewalState};
pub use scheduler::BackgroundScheduler;
pub use store::CredentialStore;
