//! Process-wide cache of the delegated database token.
//!
//! The cache holds exactly one slot. Every new physical connection asks it for
//! a secret; the slot is checked and, if needed, refreshed inside a single
//! critical section so concurrent openers never issue overlapping provider
//! calls. Already-open connections never consult it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{AuthMode, keys};
use crate::error::AuthError;
use crate::resolver::CredentialResolver;

/// How long a minted token is served from cache.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(2700);

/// Real lifetime of provider-issued database tokens.
pub const PROVIDER_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// The single cached token.
#[derive(Clone)]
pub struct CachedToken {
    pub secret: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Strictly before `expires_at`; a token expiring exactly now is stale.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Serves the delegated token to connection openers, refreshing it lazily.
///
/// Construct once at startup and share through an `Arc`.
pub struct TokenCache {
    resolver: Arc<CredentialResolver>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// # Errors
    /// Returns [`AuthError::Configuration`] if `ttl` is zero or not shorter
    /// than [`PROVIDER_TOKEN_LIFETIME`].
    pub fn new(resolver: Arc<CredentialResolver>, ttl: Duration) -> Result<Self, AuthError> {
        Self::with_clock(resolver, ttl, Arc::new(SystemClock))
    }

    /// # Errors
    /// Same as [`TokenCache::new`].
    pub fn with_clock(
        resolver: Arc<CredentialResolver>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        if ttl.is_zero() || ttl >= PROVIDER_TOKEN_LIFETIME {
            return Err(AuthError::configuration(
                keys::DB_TOKEN_TTL_SECS,
                format!(
                    "token TTL must be between 1 and {} seconds, got {}",
                    PROVIDER_TOKEN_LIFETIME.as_secs() - 1,
                    ttl.as_secs()
                ),
            ));
        }
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| AuthError::configuration(keys::DB_TOKEN_TTL_SECS, e.to_string()))?;

        Ok(Self {
            resolver,
            clock,
            ttl,
            slot: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Snapshot of the slot.
    pub async fn cached(&self) -> Option<CachedToken> {
        self.slot.lock().await.clone()
    }

    /// Secret for a connection that is about to be opened.
    ///
    /// Static mode returns an empty secret without touching the slot; callers
    /// are expected to use the static password instead. In delegated mode a
    /// valid cached token is returned immediately, otherwise the resolver is
    /// called while the slot stays locked and the result is stored with
    /// `expires_at = now + ttl`.
    ///
    /// A hung provider call stalls every opener waiting on the slot; no
    /// timeout is applied here beyond the provider client's own.
    ///
    /// # Errors
    /// Propagates [`AuthError`] from the resolver. The slot is left untouched
    /// on failure.
    pub async fn get_secret_for_new_connection(&self) -> Result<SecretString, AuthError> {
        if self.resolver.mode() == AuthMode::Static {
            return Ok(SecretString::from(String::new()));
        }

        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let Some(token) = slot.as_ref().filter(|t| t.is_valid_at(now)) {
            debug!(expires_at = %token.expires_at, "serving cached database token");
            return Ok(token.secret.clone());
        }

        let credential = self.resolver.resolve_delegated().await?;
        let expires_at = now + self.ttl;

        if let Some(provider_expiry) = credential.expires_at.filter(|t| *t < expires_at) {
            warn!(
                %provider_expiry,
                %expires_at,
                "provider token expires before the cache TTL"
            );
        }

        info!(%expires_at, "refreshed database token");
        *slot = Some(CachedToken {
            secret: credential.secret.clone(),
            expires_at,
        });
        Ok(credential.secret)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use secrecy::ExposeSecret;
    use tokio::sync::Notify;
    use tracing_test::traced_test;

    use super::*;
    use crate::config::CredentialSettings;
    use crate::error::ProviderError;
    use crate::provider::{DatabaseCredential, IdentityProvider, ProviderSession};
    use crate::resolver::tests::delegated_settings;

    struct ManualClock(SyncMutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(SyncMutex::new(
                "2026-10-14T12:00:00Z".parse().unwrap(),
            )))
        }

        fn advance(&self, by: TimeDelta) {
            *self.0.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    /// Mints `token-<n>` on the n-th call. Can be slowed down, held, or failed.
    #[derive(Default)]
    struct ScriptedProvider {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Option<Duration>,
        hold: Option<Arc<Notify>>,
        expire_time: Option<DateTime<Utc>>,
    }

    struct ScriptedSession {
        token: String,
        expire_time: Option<DateTime<Utc>>,
    }

    #[async_trait]
    impl ProviderSession for ScriptedSession {
        async fn generate_database_credential(
            &self,
            _endpoint: &str,
        ) -> Result<DatabaseCredential, ProviderError> {
            Ok(DatabaseCredential {
                token: SecretString::from(self.token.clone()),
                expire_time: self.expire_time,
            })
        }
    }

    #[async_trait]
    impl IdentityProvider for ScriptedProvider {
        async fn create_session(
            &self,
            _host: &str,
            _client_id: &str,
            _client_secret: &SecretString,
        ) -> Result<Box<dyn ProviderSession>, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProviderError::transport("connection reset"));
            }
            Ok(Box::new(ScriptedSession {
                token: format!("token-{n}"),
                expire_time: self.expire_time,
            }))
        }
    }

    fn cache_with(
        settings: CredentialSettings,
        provider: Arc<ScriptedProvider>,
        clock: Arc<ManualClock>,
    ) -> Arc<TokenCache> {
        let resolver = Arc::new(CredentialResolver::new(settings, provider));
        Arc::new(TokenCache::with_clock(resolver, DEFAULT_TOKEN_TTL, clock).unwrap())
    }

    fn ttl() -> TimeDelta {
        TimeDelta::from_std(DEFAULT_TOKEN_TTL).unwrap()
    }

    #[tokio::test]
    async fn static_mode_returns_empty_secret_without_provider_call() {
        let provider = Arc::new(ScriptedProvider::default());
        let settings = CredentialSettings {
            db_user: Some("app".to_owned()),
            db_password: Some(SecretString::from("pw")),
            ..Default::default()
        };
        let cache = cache_with(settings, provider.clone(), ManualClock::new());

        let secret = cache.get_secret_for_new_connection().await.unwrap();

        assert_eq!(secret.expose_secret(), "");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(cache.cached().await.is_none());
    }

    #[tokio::test]
    async fn valid_token_is_served_without_provider_call() {
        let provider = Arc::new(ScriptedProvider::default());
        let clock = ManualClock::new();
        let cache = cache_with(delegated_settings(), provider.clone(), clock.clone());

        let first = cache.get_secret_for_new_connection().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        // Ten minutes of validity left.
        clock.advance(ttl() - TimeDelta::minutes(10));
        let second = cache.get_secret_for_new_connection().await.unwrap();

        assert_eq!(first.expose_secret(), "token-1");
        assert_eq!(second.expose_secret(), "token-1");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_sets_expiry_to_call_time_plus_ttl() {
        let provider = Arc::new(ScriptedProvider::default());
        let clock = ManualClock::new();
        let started = clock.now();
        let cache = cache_with(delegated_settings(), provider, clock);

        cache.get_secret_for_new_connection().await.unwrap();

        let cached = cache.cached().await.unwrap();
        assert_eq!(cached.expires_at, started + TimeDelta::seconds(2700));
        assert!(cached.expires_at - started < TimeDelta::from_std(PROVIDER_TOKEN_LIFETIME).unwrap());
    }

    #[tokio::test]
    async fn expired_token_is_refreshed() {
        let provider = Arc::new(ScriptedProvider::default());
        let clock = ManualClock::new();
        let cache = cache_with(delegated_settings(), provider.clone(), clock.clone());

        cache.get_secret_for_new_connection().await.unwrap();
        clock.advance(ttl());

        // Exactly at expires_at the token is already stale.
        let refreshed = cache.get_secret_for_new_connection().await.unwrap();

        assert_eq!(refreshed.expose_secret(), "token-2");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.cached().await.unwrap().expires_at,
            clock.now() + ttl()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_openers_share_one_refresh() {
        let provider = Arc::new(ScriptedProvider {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let cache = cache_with(delegated_settings(), provider.clone(), ManualClock::new());

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let cache = cache.clone();
            tasks.spawn(async move {
                cache
                    .get_secret_for_new_connection()
                    .await
                    .unwrap()
                    .expose_secret()
                    .to_owned()
            });
        }

        let secrets = tasks.join_all().await;

        assert_eq!(secrets.len(), 16);
        assert!(secrets.iter().all(|s| s == "token-1"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_entry() {
        let provider = Arc::new(ScriptedProvider::default());
        let clock = ManualClock::new();
        let cache = cache_with(delegated_settings(), provider.clone(), clock.clone());

        cache.get_secret_for_new_connection().await.unwrap();
        let before = cache.cached().await.unwrap();

        clock.advance(ttl() + TimeDelta::seconds(1));
        provider.fail.store(true, Ordering::SeqCst);

        let err = cache.get_secret_for_new_connection().await.unwrap_err();
        assert!(matches!(err, AuthError::Provider(ProviderError::Transport(_))));

        let after = cache.cached().await.unwrap();
        assert_eq!(after.expires_at, before.expires_at);
        assert_eq!(after.secret.expose_secret(), "token-1");
    }

    #[tokio::test]
    async fn configuration_error_surfaces_through_cache() {
        let provider = Arc::new(ScriptedProvider::default());
        let mut settings = delegated_settings();
        settings.oauth_endpoint = None;
        let cache = cache_with(settings, provider.clone(), ManualClock::new());

        let err = cache.get_secret_for_new_connection().await.unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(cache.cached().await.is_none());
    }

    /// Known limitation: the provider call runs while the slot is locked, so a
    /// hung provider blocks every other opener until it returns.
    #[tokio::test]
    async fn hung_provider_stalls_other_openers() {
        let hold = Arc::new(Notify::new());
        let provider = Arc::new(ScriptedProvider {
            hold: Some(hold.clone()),
            ..Default::default()
        });
        let cache = cache_with(delegated_settings(), provider.clone(), ManualClock::new());

        let first = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_secret_for_new_connection().await }
        });
        while provider.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let blocked = tokio::time::timeout(
            Duration::from_millis(100),
            cache.get_secret_for_new_connection(),
        )
        .await;
        assert!(blocked.is_err(), "second opener should wait behind the refresh");

        hold.notify_one();
        let first = first.await.unwrap().unwrap();
        let second = cache.get_secret_for_new_connection().await.unwrap();

        assert_eq!(first.expose_secret(), "token-1");
        assert_eq!(second.expose_secret(), "token-1");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ttl_must_be_shorter_than_provider_lifetime() {
        let resolver = Arc::new(CredentialResolver::new(
            delegated_settings(),
            Arc::new(ScriptedProvider::default()),
        ));

        for ttl in [Duration::ZERO, PROVIDER_TOKEN_LIFETIME, Duration::from_secs(7200)] {
            let err = TokenCache::new(resolver.clone(), ttl).err().unwrap();
            assert!(
                matches!(err, AuthError::Configuration { ref key, .. } if key == keys::DB_TOKEN_TTL_SECS)
            );
        }
        assert!(TokenCache::new(resolver, Duration::from_secs(3599)).is_ok());
    }

    #[tokio::test]
    #[traced_test]
    async fn short_provider_expiry_is_logged() {
        let clock = ManualClock::new();
        let provider = Arc::new(ScriptedProvider {
            expire_time: Some(clock.now() + TimeDelta::minutes(30)),
            ..Default::default()
        });
        let cache = cache_with(delegated_settings(), provider, clock);

        cache.get_secret_for_new_connection().await.unwrap();

        assert!(logs_contain("provider token expires before the cache TTL"));
        assert!(!logs_contain("token-1"));
    }
}
