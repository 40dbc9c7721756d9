//! Mock implementations for testing.
//!
//! This module provides mock implementations of all trait abstractions,
//! enabling unit testing without network dependencies or file system access.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses
//! - [`InMemoryStorage`] - In-memory key-value storage
//! - [`MockRenewalEndpoint`] - Scripted renewal outcomes with call counting

pub mod http;
pub mod renewal;
pub mod storage;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use renewal::MockRenewalEndpoint;
pub use storage::InMemoryStorage;
