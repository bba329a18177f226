use std::sync::Arc;

use lakebase_auth::{AuthMode, SecretString, TokenCache};

use crate::config::DbConnConfig;
use crate::error::DbError;
use crate::interceptor::TokenPasswordInterceptor;
use crate::manager::PgConnectionManager;
use crate::params::ConnectParams;
use crate::pool::{Pool, PoolState, PooledConnection};

pub type DbConn = PooledConnection<PgConnectionManager>;

/// Shared database handle. Cheap to clone.
#[derive(Clone)]
pub struct Db {
    pool: Pool<PgConnectionManager>,
}

impl Db {
    #[must_use]
    pub fn from_pool(pool: Pool<PgConnectionManager>) -> Self {
        Self { pool }
    }

    /// # Errors
    /// See [`Pool::get`].
    pub async fn conn(&self) -> Result<DbConn, DbError> {
        self.pool.get().await
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<PgConnectionManager> {
        &self.pool
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        self.pool.state()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Build the pool for the configured auth mode.
///
/// Static mode bakes the configured password into every connection.
/// Delegated mode logs in as the service principal and installs a
/// [`TokenPasswordInterceptor`], so each new connection gets a cached token
/// and reused connections never touch the cache. No connection is opened here.
///
/// # Errors
/// Returns [`DbError::Config`] when the host or user is missing, or the pool
/// limits are invalid.
pub fn build_db(config: &DbConnConfig, cache: &Arc<TokenCache>) -> Result<Db, DbError> {
    let resolver = cache.resolver();
    let user = resolver.principal();
    if config.host.is_empty() {
        return Err(DbError::config("database host is not set"));
    }
    if user.is_empty() {
        return Err(DbError::config("database user is not set"));
    }

    let mode = resolver.mode();
    let manager = match mode {
        AuthMode::Static => {
            let password = resolver.resolve_static().secret;
            PgConnectionManager::new(ConnectParams::from_config(config, user, password))
        }
        AuthMode::Delegated => {
            let base = ConnectParams::from_config(config, user, SecretString::from(""));
            PgConnectionManager::new(base)
                .with_interceptor(Arc::new(TokenPasswordInterceptor::new(Arc::clone(cache))))
        }
    };

    tracing::info!(
        dsn = %manager.base().redacted_dsn(),
        ?mode,
        pool_size = config.pool.pool_size,
        max_overflow = config.pool.max_overflow,
        "database pool configured"
    );
    Ok(Db::from_pool(Pool::new(manager, config.pool.clone())?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use lakebase_auth::{
        CredentialResolver, CredentialSettings, DEFAULT_TOKEN_TTL, ExposeSecret,
        IdentityProvider, ProviderError, ProviderSession,
    };

    use super::*;

    struct Unreachable;

    #[async_trait::async_trait]
    impl IdentityProvider for Unreachable {
        async fn create_session(
            &self,
            _host: &str,
            _client_id: &str,
            _client_secret: &SecretString,
        ) -> Result<Box<dyn ProviderSession>, ProviderError> {
            Err(ProviderError::transport("not expected in this test"))
        }
    }

    fn cache(settings: CredentialSettings) -> Arc<TokenCache> {
        let resolver = Arc::new(CredentialResolver::new(settings, Arc::new(Unreachable)));
        Arc::new(TokenCache::new(resolver, DEFAULT_TOKEN_TTL).unwrap())
    }

    fn config() -> DbConnConfig {
        DbConnConfig {
            host: "instance.database.example.com".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn static_mode_uses_configured_user_and_password() {
        let cache = cache(CredentialSettings {
            db_user: Some("app".to_owned()),
            db_password: Some(SecretString::from("pw")),
            ..Default::default()
        });

        let db = build_db(&config(), &cache).unwrap();
        let base = db.pool().manager().base();

        assert_eq!(base.user, "app");
        assert_eq!(base.password.expose_secret(), "pw");
        assert_eq!(db.state().connections, 0);
    }

    #[tokio::test]
    async fn delegated_mode_logs_in_as_client_id_without_baked_password() {
        let cache = cache(CredentialSettings {
            client_id: Some("sp-123".to_owned()),
            client_secret: Some(SecretString::from("shh")),
            db_user: Some("ignored".to_owned()),
            db_password: Some(SecretString::from("ignored")),
            ..Default::default()
        });

        let db = build_db(&config(), &cache).unwrap();
        let base = db.pool().manager().base();

        assert_eq!(base.user, "sp-123");
        assert_eq!(base.password.expose_secret(), "");
        // Host and endpoint are missing, so the first open fails on credentials.
        let err = db.conn().await.err().expect("credentials are incomplete");
        assert!(matches!(err, DbError::Credential(e) if e.is_configuration()));
    }

    #[test]
    fn missing_host_or_user_is_rejected() {
        let with_user = cache(CredentialSettings {
            db_user: Some("app".to_owned()),
            ..Default::default()
        });
        let no_host = DbConnConfig::default();
        assert!(matches!(build_db(&no_host, &with_user), Err(DbError::Config(_))));

        let no_user = cache(CredentialSettings::default());
        assert!(matches!(build_db(&config(), &no_user), Err(DbError::Config(_))));
    }
}
