//! # keyhole_client
//!
//! HTTP client for the Keyhole API.
//!
//! [`AuthClient`] keeps the session in a [`SessionStore`] and refreshes an
//! expired access token once per request before giving up.

pub mod client;
pub mod error;
pub mod models;
pub mod session;

pub use client::AuthClient;
pub use error::{ApiFailure, ClientError};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
