use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::{debug, info};

use crate::config::{AuthMode, CredentialSettings, keys, normalize_host};
use crate::error::AuthError;
use crate::provider::IdentityProvider;

/// A database principal and the secret it authenticates with.
#[derive(Clone)]
pub struct Credential {
    pub principal: String,
    pub secret: SecretString,
    /// Provider-reported expiry of `secret`; `None` for static credentials.
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Produces database credentials from configuration or the identity provider.
pub struct CredentialResolver {
    settings: CredentialSettings,
    provider: Arc<dyn IdentityProvider>,
}

impl CredentialResolver {
    #[must_use]
    pub fn new(settings: CredentialSettings, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { settings, provider }
    }

    /// Classify the current configuration. Cheap; recomputed on every call.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.settings.mode()
    }

    #[must_use]
    pub fn settings(&self) -> &CredentialSettings {
        &self.settings
    }

    /// User name a new connection authenticates as. No network call.
    #[must_use]
    pub fn principal(&self) -> String {
        match self.mode() {
            AuthMode::Delegated => self.settings.client_id().unwrap_or_default().to_owned(),
            AuthMode::Static => self.settings.db_user().to_owned(),
        }
    }

    /// Resolve a credential for the active mode.
    ///
    /// # Errors
    /// See [`CredentialResolver::resolve_delegated`]. Static resolution never fails.
    pub async fn resolve(&self) -> Result<Credential, AuthError> {
        match self.mode() {
            AuthMode::Static => Ok(self.resolve_static()),
            AuthMode::Delegated => self.resolve_delegated().await,
        }
    }

    /// Fixed user/password from configuration. Both may be empty.
    #[must_use]
    pub fn resolve_static(&self) -> Credential {
        Credential {
            principal: self.settings.db_user().to_owned(),
            secret: self.settings.db_password(),
            expires_at: None,
        }
    }

    /// Mint a short-lived credential through the identity provider.
    ///
    /// Required keys are checked before any network call. Provider failures
    /// are returned as-is; retrying is the caller's decision.
    ///
    /// # Errors
    /// - [`AuthError::Configuration`] if client credentials, host or endpoint are missing.
    /// - [`AuthError::Provider`] if the provider call fails.
    pub async fn resolve_delegated(&self) -> Result<Credential, AuthError> {
        let s = &self.settings;
        let client_id = s.client_id().ok_or_else(|| {
            AuthError::configuration(keys::CLIENT_ID, "client id is required for delegated mode")
        })?;
        let client_secret = s.client_secret().ok_or_else(|| {
            AuthError::configuration(
                keys::CLIENT_SECRET,
                "client secret is required for delegated mode",
            )
        })?;
        let host = s.host().ok_or_else(|| {
            AuthError::configuration(
                keys::HOST,
                "delegated mode is enabled but the workspace host is not set \
                 (e.g. https://my-workspace.cloud.databricks.com)",
            )
        })?;
        let endpoint = s.oauth_endpoint().ok_or_else(|| {
            AuthError::configuration(
                keys::DB_OAUTH_ENDPOINT,
                "delegated mode is enabled but the database endpoint is not set \
                 (projects/{project_id}/branches/{branch_id}/endpoints/{endpoint_id})",
            )
        })?;

        let host = normalize_host(host);
        debug!(%host, endpoint, "resolving delegated database credential");

        let session = self
            .provider
            .create_session(&host, client_id, client_secret)
            .await?;
        let credential = session.generate_database_credential(endpoint).await?;

        info!(endpoint, "minted database credential");
        Ok(Credential {
            principal: client_id.to_owned(),
            secret: credential.token,
            expires_at: credential.expire_time,
        })
    }
}
