//! Pre-connect interceptors.
//!
//! The pool calls every registered interceptor right before it opens a new
//! physical connection. Reusing an idle connection never goes through here.

use std::sync::Arc;

use async_trait::async_trait;
use lakebase_auth::TokenCache;

use crate::error::DbError;
use crate::params::ConnectParams;

#[async_trait]
pub trait PreConnectInterceptor: Send + Sync {
    /// Rewrite the parameters of the connection about to be opened.
    ///
    /// # Errors
    /// Any error aborts the open and is returned to the caller acquiring
    /// the connection.
    async fn before_open(&self, params: ConnectParams) -> Result<ConnectParams, DbError>;
}

/// Sets the password to the current delegated database token.
pub struct TokenPasswordInterceptor {
    cache: Arc<TokenCache>,
}

impl TokenPasswordInterceptor {
    #[must_use]
    pub fn new(cache: Arc<TokenCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl PreConnectInterceptor for TokenPasswordInterceptor {
    async fn before_open(&self, mut params: ConnectParams) -> Result<ConnectParams, DbError> {
        params.password = self.cache.get_secret_for_new_connection().await?;
        Ok(params)
    }
}
