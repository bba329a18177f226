use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::{HeaderName, Request, StatusCode};
use catalog::{CatalogService, PgCatalogRepository};
use lakebase_auth::{CredentialResolver, IdentityProvider, TokenCache};
use lakebase_db::{Db, build_db, run_migrations};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;

const REQUEST_ID: &str = "x-request-id";

/// Everything `main` needs to serve and shut down.
pub struct App {
    pub router: Router,
    /// `None` when the database is not configured.
    pub db: Option<Db>,
}

/// Wire credentials, pool and routes. No database connection is opened
/// unless migrations are enabled.
pub async fn build(config: &AppConfig, provider: Arc<dyn IdentityProvider>) -> anyhow::Result<App> {
    let resolver = Arc::new(CredentialResolver::new(config.credentials.clone(), provider));
    let mode = resolver.mode();
    let cache = Arc::new(TokenCache::new(
        resolver,
        Duration::from_secs(config.token_ttl_secs),
    )?);

    let principal = cache.resolver().principal();
    let db = if config.db.is_configured(&principal) {
        let db = build_db(&config.db, &cache)?;
        if config.run_migrations {
            run_migrations(&db)
                .await
                .context("failed to apply database migrations")?;
        }
        Some(db)
    } else {
        tracing::warn!(?mode, "database host or user not set; catalog API will answer 503");
        None
    };

    let service = match &db {
        Some(db) => CatalogService::new(Arc::new(PgCatalogRepository::new(db.clone()))),
        None => CatalogService::unconfigured(),
    };
    let router = catalog::router(Arc::new(service), env!("CARGO_PKG_VERSION"));

    Ok(App {
        router: with_middleware(router, Duration::from_secs(config.request_timeout_secs)),
        db,
    })
}

/// Last layer added runs first: request id, then trace, then timeout.
fn with_middleware(router: Router, request_timeout: Duration) -> Router {
    let x_request_id = HeaderName::from_static(REQUEST_ID);

    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<axum::body::Body>| {
                let rid = req
                    .headers()
                    .get(REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
}
