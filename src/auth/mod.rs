//! Authentication module for blogdesk.
//!
//! This module provides:
//! - The credential model
//! - Token claim decoding and sealed persistence encoding
//! - Session key material
//! - The blog API client for the renewal endpoint

pub mod api;
pub mod codec;
pub mod credentials;
pub mod key;

pub use api::AuthApiClient;
pub use codec::{decode_expiry, decode_subject, CredentialCodec};
pub use credentials::{Credential, SessionIdentity, UserProfile};
pub use key::SessionKey;
