use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};

use crate::error::DbError;
use crate::interceptor::PreConnectInterceptor;
use crate::params::ConnectParams;

/// Opens and checks connections for [`crate::Pool`].
#[async_trait]
pub trait ManageConnection: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Open a new physical connection.
    ///
    /// # Errors
    /// Returns whatever prevented the connection from being established.
    async fn connect(&self) -> Result<Self::Connection, DbError>;

    /// Liveness check for an idle connection about to be reused.
    ///
    /// # Errors
    /// An error means the connection is discarded.
    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), DbError>;

    /// Close a connection the pool no longer wants.
    async fn disconnect(&self, conn: Self::Connection) {
        drop(conn);
    }
}

/// Postgres manager that runs the interceptor chain on every open.
pub struct PgConnectionManager {
    base: ConnectParams,
    interceptors: Vec<Arc<dyn PreConnectInterceptor>>,
}

impl PgConnectionManager {
    #[must_use]
    pub fn new(base: ConnectParams) -> Self {
        Self {
            base,
            interceptors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn PreConnectInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    #[must_use]
    pub fn base(&self) -> &ConnectParams {
        &self.base
    }

    /// Parameters for the next open, after every interceptor has run.
    ///
    /// # Errors
    /// Propagates the first interceptor failure.
    pub async fn prepare(&self) -> Result<ConnectParams, DbError> {
        let mut params = self.base.clone();
        for interceptor in &self.interceptors {
            params = interceptor.before_open(params).await?;
        }
        Ok(params)
    }
}

#[async_trait]
impl ManageConnection for PgConnectionManager {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection, DbError> {
        let params = self.prepare().await?;
        tracing::debug!(dsn = %params.redacted_dsn(), "opening database connection");
        let opts = params.to_pg_options()?;
        Ok(PgConnection::connect_with(&opts).await?)
    }

    async fn is_valid(&self, conn: &mut PgConnection) -> Result<(), DbError> {
        conn.ping().await?;
        Ok(())
    }

    async fn disconnect(&self, conn: PgConnection) {
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "error closing database connection");
        }
    }
}
