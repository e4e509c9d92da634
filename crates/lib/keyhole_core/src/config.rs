//! Token and cache lifetimes used by the auth service.

use std::time::Duration;

use crate::cache::{PROFILE_TTL, REFRESH_SLOT_TTL};

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Longest accepted token lifetime: 365 days.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Lifetimes for issued tokens and cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub profile_cache_ttl: Duration,
    pub refresh_slot_ttl: Duration,
}

impl AuthSettings {
    /// Defaults with explicit token lifetimes.
    pub fn with_token_ttls(access_token_ttl: Duration, refresh_token_ttl: Duration) -> Self {
        Self {
            access_token_ttl,
            refresh_token_ttl,
            ..Self::default()
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            profile_cache_ttl: PROFILE_TTL,
            refresh_slot_ttl: REFRESH_SLOT_TTL,
        }
    }
}
