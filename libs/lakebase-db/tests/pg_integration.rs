#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(feature = "integration")]

use std::sync::Arc;

use anyhow::Result;
use lakebase_auth::{
    CredentialResolver, CredentialSettings, DEFAULT_TOKEN_TTL, DatabricksIdentityProvider,
    SecretString, TokenCache,
};
use lakebase_db::{DbConnConfig, PoolConfig, build_db, run_migrations};
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

async fn start() -> Result<(ContainerAsync<Postgres>, DbConnConfig, Arc<TokenCache>)> {
    let node = Postgres::default().start().await?;
    let config = DbConnConfig {
        host: node.get_host().await?.to_string(),
        port: node.get_host_port_ipv4(5432).await?,
        name: "postgres".to_owned(),
        sslmode: "disable".to_owned(),
        application_name: Some("lakebase-db-tests".to_owned()),
        pool: PoolConfig {
            pool_size: 2,
            max_overflow: 1,
            ..Default::default()
        },
    };
    let settings = CredentialSettings {
        db_user: Some("postgres".to_owned()),
        db_password: Some(SecretString::from("postgres")),
        ..Default::default()
    };
    let provider = DatabricksIdentityProvider::new(std::time::Duration::from_secs(5))?;
    let resolver = Arc::new(CredentialResolver::new(settings, Arc::new(provider)));
    let cache = Arc::new(TokenCache::new(resolver, DEFAULT_TOKEN_TTL)?);
    Ok((node, config, cache))
}

#[tokio::test]
async fn static_credentials_connect_and_migrate() -> Result<()> {
    let (_node, config, cache) = start().await?;
    let db = build_db(&config, &cache)?;

    run_migrations(&db).await?;
    // Applying twice is a no-op.
    run_migrations(&db).await?;

    let mut conn = db.conn().await?;
    let (products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&mut *conn)
        .await?;
    assert_eq!(products, 13);
    drop(conn);

    assert_eq!(db.state().idle, 1);
    db.close().await;
    assert_eq!(db.state().connections, 0);
    Ok(())
}

#[tokio::test]
async fn wrong_password_fails_to_connect() -> Result<()> {
    let (_node, config, _) = start().await?;
    let settings = CredentialSettings {
        db_user: Some("postgres".to_owned()),
        db_password: Some(SecretString::from("wrong")),
        ..Default::default()
    };
    let provider = DatabricksIdentityProvider::new(std::time::Duration::from_secs(5))?;
    let resolver = Arc::new(CredentialResolver::new(settings, Arc::new(provider)));
    let cache = Arc::new(TokenCache::new(resolver, DEFAULT_TOKEN_TTL)?);

    let db = build_db(&config, &cache)?;
    assert!(db.conn().await.is_err());
    assert_eq!(db.state().connections, 0);
    Ok(())
}
