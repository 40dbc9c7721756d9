//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP client operations
//! - [`KeyValueStorage`] - durable storage for the session blob
//! - [`RenewalEndpoint`] - the credential renewal network call

pub mod http;
pub mod renewal;
pub mod storage;

pub use http::{Headers, HttpClient, HttpError, Response};
pub use renewal::{RenewalEndpoint, RenewalGrant, RenewalRequest};
pub use storage::KeyValueStorage;
