//! Identity provider seam.
//!
//! The resolver only needs two calls: open an authenticated session from
//! client credentials, then mint a database credential for one endpoint.

mod databricks;

pub use databricks::DatabricksIdentityProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::error::ProviderError;

/// A scoped database credential minted by the provider.
#[derive(Debug, Clone)]
pub struct DatabaseCredential {
    pub token: SecretString,
    /// Real expiry as reported by the provider, if any.
    pub expire_time: Option<DateTime<Utc>>,
}

/// Exchanges long-lived client credentials for an authenticated session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// # Errors
    /// Returns [`ProviderError`] if the exchange fails or the response is unusable.
    async fn create_session(
        &self,
        host: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<Box<dyn ProviderSession>, ProviderError>;
}

/// An authenticated provider session.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// Request a database credential scoped to `endpoint`.
    ///
    /// # Errors
    /// Returns [`ProviderError`] if the request fails or the response has no token.
    async fn generate_database_credential(
        &self,
        endpoint: &str,
    ) -> Result<DatabaseCredential, ProviderError>;
}
