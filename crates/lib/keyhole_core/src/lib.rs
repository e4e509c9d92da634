//! # keyhole_core
//!
//! Core domain logic for Keyhole: the token codec, password hashing, the
//! credential store, the session cache and the [`auth::service::AuthService`]
//! that ties them together.

pub mod auth;
pub mod cache;
pub mod config;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
