//! Authentication service: register, login, refresh, profile and logout.
//!
//! The service owns the cache-aside policy. Store writes are fatal on
//! failure; cache writes are best effort and only logged. Token checks never
//! consult the cache: an access token stays valid until it expires, and the
//! refresh slot is a stored value, not a revocation list.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::jwt::{TokenCodec, TokenError};
use super::password::{hash_password, verify_decoy, verify_password};
use super::store::CredentialStore;
use super::validation::{validate_login, validate_registration};
use super::AuthError;
use crate::cache::SessionCache;
use crate::config::AuthSettings;
use crate::models::auth::{AccessGrant, HealthReport, LoginGrant, NewUser, TokenKind, UserView};

/// Orchestrates the credential store, session cache and token codec.
///
/// Cheap to clone; all handles are shared.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    cache: SessionCache,
    codec: TokenCodec,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cache: SessionCache,
        codec: TokenCodec,
        settings: AuthSettings,
    ) -> Self {
        Self {
            store,
            cache,
            codec,
            settings,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Create an account. Does not log the user in.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserView, AuthError> {
        validate_registration(username, email, password)?;

        if self.store.identity_taken(username, email).await? {
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_password(password).await?;
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        let view = user.view();
        self.cache_profile(&view).await;
        info!(user_id = view.id, "user registered");
        Ok(view)
    }

    /// Verify credentials and issue an access/refresh pair.
    ///
    /// Unknown usernames and wrong passwords fail identically and both pay
    /// for one bcrypt verification.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, AuthError> {
        validate_login(username, password)?;

        let Some(user) = self.store.find_by_username(username).await? else {
            verify_decoy(password).await?;
            debug!("login rejected");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash).await? {
            debug!("login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.issue(user.id, TokenKind::Access)?;
        let refresh_token = self.issue(user.id, TokenKind::Refresh)?;
        let view = user.view();

        let (profile, slot) = tokio::join!(
            self.cache.put_profile(view.id, &view, self.settings.profile_cache_ttl),
            self.cache
                .put_refresh_slot(view.id, &refresh_token, self.settings.refresh_slot_ttl),
        );
        if let Err(e) = profile {
            warn!(user_id = view.id, error = %e, "failed to cache profile");
        }
        if let Err(e) = slot {
            warn!(user_id = view.id, error = %e, "failed to store refresh slot");
        }

        info!(user_id = view.id, "user logged in");
        Ok(LoginGrant {
            access_token,
            refresh_token,
            user: view,
        })
    }

    /// Exchange a refresh token for a new access token. The refresh token is
    /// not rotated and the refresh slot is not consulted.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError> {
        let user_id = self.authenticate(refresh_token, TokenKind::Refresh)?;

        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::NotFound);
        }

        let access_token = self.issue(user_id, TokenKind::Access)?;
        debug!(user_id, "access token refreshed");
        Ok(AccessGrant { access_token })
    }

    /// Cache-aside profile read.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserView, AuthError> {
        let user_id = self.authenticate(access_token, TokenKind::Access)?;

        match self.cache.get_profile(user_id).await {
            Ok(Some(view)) => {
                debug!(user_id, "profile cache hit");
                return Ok(view);
            }
            Ok(None) => debug!(user_id, "profile cache miss"),
            Err(e) => warn!(user_id, error = %e, "profile cache read failed, loading from store"),
        }

        let user = self.store.find_by_id(user_id).await?.ok_or(AuthError::NotFound)?;
        let view = user.view();
        self.cache_profile(&view).await;
        Ok(view)
    }

    /// Drop the refresh slot and cached profile. Idempotent.
    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let user_id = self.authenticate(access_token, TokenKind::Access)?;

        let (slot, profile) = tokio::join!(
            self.cache.drop_refresh_slot(user_id),
            self.cache.drop_profile(user_id),
        );
        slot?;
        profile?;

        info!(user_id, "user logged out");
        Ok(())
    }

    /// Ping the store and the cache.
    pub async fn health(&self) -> HealthReport {
        let (database, cache) = tokio::join!(self.store.ping(), self.cache.ping());
        if let Err(e) = &database {
            warn!(error = %e, "credential store unreachable");
        }
        if let Err(e) = &cache {
            warn!(error = %e, "session cache unreachable");
        }
        HealthReport {
            database: database.is_ok(),
            cache: cache.is_ok(),
        }
    }

    /// Verify `token` as `kind`, folding every failure into `Unauthorized`.
    pub fn authenticate(&self, token: &str, kind: TokenKind) -> Result<i64, AuthError> {
        self.codec.verify_as(token, kind).map_err(|e| {
            debug!(required = %kind, reason = %e, "token rejected");
            AuthError::Unauthorized(kind)
        })
    }

    fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String, AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.settings.access_token_ttl,
            TokenKind::Refresh => self.settings.refresh_token_ttl,
        };
        self.codec.issue(user_id, kind, ttl).map_err(|e| match e {
            TokenError::Encode(msg) => AuthError::Internal(msg),
            other => AuthError::Internal(other.to_string()),
        })
    }

    async fn cache_profile(&self, view: &UserView) {
        if let Err(e) = self
            .cache
            .put_profile(view.id, view, self.settings.profile_cache_ttl)
            .await
        {
            warn!(user_id = view.id, error = %e, "failed to cache profile");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use futures::future::join_all;

    use super::*;
    use crate::auth::memory::MemoryCredentialStore;
    use crate::cache::CacheStore;
    use crate::cache::memory::MemoryCacheStore;

    const SECRET: &[u8] = b"service-test-secret-at-least-32-chars";

    struct Harness {
        store: Arc<MemoryCredentialStore>,
        cache_store: Arc<MemoryCacheStore>,
        service: AuthService,
    }

    fn harness_with(settings: AuthSettings) -> Harness {
        let store = Arc::new(MemoryCredentialStore::new());
        let cache_store = Arc::new(MemoryCacheStore::new());
        let service = AuthService::new(
            store.clone(),
            SessionCache::new(cache_store.clone()),
            TokenCodec::new(SECRET),
            settings,
        );
        Harness {
            store,
            cache_store,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(AuthSettings::default())
    }

    async fn alice(h: &Harness) -> LoginGrant {
        h.service.register("alice", "alice@x.com", "secret1").await.unwrap();
        h.service.login("alice", "secret1").await.unwrap()
    }

    #[tokio::test]
    async fn register_then_login() {
        let h = harness();
        let view = h.service.register("alice", "alice@x.com", "secret1").await.unwrap();
        assert_eq!(view.username, "alice");
        assert_eq!(view.email, "alice@x.com");

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());

        let grant = h.service.login("alice", "secret1").await.unwrap();
        assert_eq!(grant.user, view);
        assert_ne!(grant.access_token, grant.refresh_token);
    }

    #[tokio::test]
    async fn register_caches_profile_without_issuing_tokens() {
        let h = harness();
        let view = h.service.register("alice", "alice@x.com", "secret1").await.unwrap();
        let cache = h.service.cache();
        assert_eq!(cache.get_profile(view.id).await.unwrap(), Some(view.clone()));
        assert_eq!(cache.get_refresh_slot(view.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let h = harness();
        h.service.register("alice", "alice@x.com", "secret1").await.unwrap();

        let same_name = h.service.register("alice", "other@x.com", "secret1").await;
        assert!(matches!(same_name, Err(AuthError::Conflict)));

        let same_email = h.service.register("alice2", "alice@x.com", "secret1").await;
        assert!(matches!(same_email, Err(AuthError::Conflict)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_has_one_winner() {
        let h = harness();
        let attempts = (0..6).map(|_| {
            let service = h.service.clone();
            tokio::spawn(async move { service.register("alice", "alice@x.com", "secret1").await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AuthError::Conflict)))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(conflicts, results.len() - 1);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_the_store() {
        let h = harness();
        let result = h.service.register("al", "alice@x.com", "secret1").await;
        assert!(matches!(result, Err(AuthError::ValidationError(_))));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let h = harness();
        h.service.register("alice", "alice@x.com", "secret1").await.unwrap();

        let unknown = h.service.login("bob", "secret1").await.unwrap_err();
        let wrong_pw = h.service.login("alice", "wrong-pw").await.unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong_pw, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong_pw.to_string());
    }

    #[tokio::test]
    async fn unknown_user_costs_as_much_as_wrong_password() {
        let h = harness();
        h.service.register("alice", "alice@x.com", "secret1").await.unwrap();
        // First use builds the decoy hash.
        h.service.login("nobody", "secret1").await.unwrap_err();

        let started = Instant::now();
        h.service.login("bob", "secret1").await.unwrap_err();
        let unknown = started.elapsed();

        let started = Instant::now();
        h.service.login("alice", "wrong-pw").await.unwrap_err();
        let wrong_pw = started.elapsed();

        assert!(
            unknown * 4 >= wrong_pw,
            "unknown={unknown:?} wrong_pw={wrong_pw:?}"
        );
    }

    #[tokio::test]
    async fn oversized_token_lifetime_fails_login_cleanly() {
        let h = harness_with(AuthSettings::with_token_ttls(
            Duration::from_secs(900),
            Duration::from_secs(10_000_000_000_000),
        ));
        h.service.register("alice", "alice@x.com", "secret1").await.unwrap();
        assert!(matches!(
            h.service.login("alice", "secret1").await,
            Err(AuthError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn login_writes_refresh_slot_and_supersedes_it() {
        let h = harness();
        let first = alice(&h).await;
        let cache = h.service.cache();
        assert_eq!(
            cache.get_refresh_slot(first.user.id).await.unwrap().as_deref(),
            Some(first.refresh_token.as_str())
        );

        // Tokens carry second-resolution timestamps.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let second = h.service.login("alice", "secret1").await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);
        assert_eq!(
            cache.get_refresh_slot(first.user.id).await.unwrap().as_deref(),
            Some(second.refresh_token.as_str())
        );
    }

    #[tokio::test]
    async fn refresh_issues_access_token_only() {
        let h = harness();
        let grant = alice(&h).await;

        let refreshed = h.service.refresh(&grant.refresh_token).await.unwrap();
        let profile = h.service.fetch_profile(&refreshed.access_token).await.unwrap();
        assert_eq!(profile.id, grant.user.id);

        // The same refresh token keeps working.
        assert!(h.service.refresh(&grant.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_does_not_need_the_slot() {
        let h = harness();
        let grant = alice(&h).await;
        h.service.cache().drop_refresh_slot(grant.user.id).await.unwrap();
        assert!(h.service.refresh(&grant.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_kind_is_unauthorized() {
        let h = harness();
        let grant = alice(&h).await;

        let refresh_with_access = h.service.refresh(&grant.access_token).await;
        assert!(matches!(
            refresh_with_access,
            Err(AuthError::Unauthorized(TokenKind::Refresh))
        ));

        let profile_with_refresh = h.service.fetch_profile(&grant.refresh_token).await;
        assert!(matches!(
            profile_with_refresh,
            Err(AuthError::Unauthorized(TokenKind::Access))
        ));

        let logout_with_refresh = h.service.logout(&grant.refresh_token).await;
        assert!(matches!(
            logout_with_refresh,
            Err(AuthError::Unauthorized(TokenKind::Access))
        ));
    }

    #[tokio::test]
    async fn garbage_and_foreign_tokens_are_unauthorized() {
        let h = harness();
        let foreign = TokenCodec::new(b"some-other-secret-at-least-32-chars")
            .issue(1, TokenKind::Access, Duration::from_secs(60))
            .unwrap();
        for token in ["", "garbage", foreign.as_str()] {
            assert!(matches!(
                h.service.fetch_profile(token).await,
                Err(AuthError::Unauthorized(TokenKind::Access))
            ));
        }
    }

    #[tokio::test]
    async fn refresh_for_vanished_user_is_not_found() {
        let h = harness();
        let grant = alice(&h).await;
        h.store.remove_user(grant.user.id);
        assert!(matches!(
            h.service.refresh(&grant.refresh_token).await,
            Err(AuthError::NotFound)
        ));
    }

    #[tokio::test]
    async fn profile_rebuilds_cache_from_store() {
        let h = harness();
        let grant = alice(&h).await;
        let cache = h.service.cache();

        cache.drop_profile(grant.user.id).await.unwrap();
        let view = h.service.fetch_profile(&grant.access_token).await.unwrap();
        assert_eq!(view, grant.user);
        assert_eq!(cache.get_profile(grant.user.id).await.unwrap(), Some(view));
    }

    #[tokio::test]
    async fn profile_for_vanished_user_is_not_found_on_miss() {
        let h = harness();
        let grant = alice(&h).await;
        h.store.remove_user(grant.user.id);
        h.service.cache().drop_profile(grant.user.id).await.unwrap();
        assert!(matches!(
            h.service.fetch_profile(&grant.access_token).await,
            Err(AuthError::NotFound)
        ));
    }

    #[tokio::test]
    async fn corrupt_cache_entry_is_treated_as_miss() {
        let h = harness();
        let grant = alice(&h).await;
        let id = grant.user.id;
        h.cache_store
            .set_ex(&SessionCache::profile_key(id), "{broken", Duration::from_secs(60))
            .await
            .unwrap();
        let view = h.service.fetch_profile(&grant.access_token).await.unwrap();
        assert_eq!(view, grant.user);
        assert_eq!(h.service.cache().get_profile(id).await.unwrap(), Some(view));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let h = harness();
        let grant = alice(&h).await;
        let id = grant.user.id;

        h.service.logout(&grant.access_token).await.unwrap();
        h.service.logout(&grant.access_token).await.unwrap();

        let cache = h.service.cache();
        assert_eq!(cache.get_refresh_slot(id).await.unwrap(), None);
        assert_eq!(cache.get_profile(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn access_token_survives_logout() {
        let h = harness();
        let grant = alice(&h).await;
        h.service.logout(&grant.access_token).await.unwrap();

        let view = h.service.fetch_profile(&grant.access_token).await.unwrap();
        assert_eq!(view.username, "alice");
        assert_eq!(view.email, "alice@x.com");
        assert_eq!(
            h.service.cache().get_profile(grant.user.id).await.unwrap(),
            Some(view)
        );
    }

    #[tokio::test]
    async fn expired_access_token_then_refresh() {
        let h = harness_with(AuthSettings::with_token_ttls(
            Duration::from_secs(1),
            Duration::from_secs(60),
        ));
        let grant = alice(&h).await;
        tokio::time::sleep(Duration::from_millis(2100)).await;

        assert!(matches!(
            h.service.fetch_profile(&grant.access_token).await,
            Err(AuthError::Unauthorized(TokenKind::Access))
        ));
        let refreshed = h.service.refresh(&grant.refresh_token).await.unwrap();
        let view = h.service.fetch_profile(&refreshed.access_token).await.unwrap();
        assert_eq!(view.id, grant.user.id);
    }

    #[tokio::test]
    async fn cache_outage_does_not_fail_register_login_or_profile() {
        let h = harness();
        h.cache_store.set_offline(true);

        let view = h.service.register("alice", "alice@x.com", "secret1").await.unwrap();
        let grant = h.service.login("alice", "secret1").await.unwrap();
        let profile = h.service.fetch_profile(&grant.access_token).await.unwrap();
        assert_eq!(profile, view);

        h.cache_store.set_offline(false);
        assert!(h.cache_store.is_empty());
    }

    #[tokio::test]
    async fn cache_outage_fails_logout() {
        let h = harness();
        let grant = alice(&h).await;
        h.cache_store.set_offline(true);
        assert!(matches!(
            h.service.logout(&grant.access_token).await,
            Err(AuthError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn store_outage_is_unavailable() {
        let h = harness();
        let grant = alice(&h).await;
        h.store.set_offline(true);

        assert!(matches!(
            h.service.register("bob", "bob@x.com", "secret1").await,
            Err(AuthError::Unavailable(_))
        ));
        assert!(matches!(
            h.service.login("alice", "secret1").await,
            Err(AuthError::Unavailable(_))
        ));
        assert!(matches!(
            h.service.refresh(&grant.refresh_token).await,
            Err(AuthError::Unavailable(_))
        ));
        // Cached profile still answers.
        assert!(h.service.fetch_profile(&grant.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn health_reports_each_backend() {
        let h = harness();
        assert!(h.service.health().await.is_healthy());

        h.cache_store.set_offline(true);
        let report = h.service.health().await;
        assert_eq!(report, HealthReport { database: true, cache: false });

        h.store.set_offline(true);
        h.cache_store.set_offline(false);
        let report = h.service.health().await;
        assert_eq!(report, HealthReport { database: false, cache: true });
    }
}
