//! blogdesk - session lifecycle for the blog CMS client
//!
//! Keeps the signed-in user's bearer credential valid: decodes its expiry,
//! renews it single-flight before it lapses, persists it sealed, and
//! broadcasts session changes to the rest of the application.
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod traits;
