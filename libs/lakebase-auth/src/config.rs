//! Credential configuration snapshot and authentication mode detection.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Environment keys, used in error messages so operators know what to set.
pub mod keys {
    pub const CLIENT_ID: &str = "DATABRICKS_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "DATABRICKS_CLIENT_SECRET";
    pub const HOST: &str = "DATABRICKS_HOST";
    pub const DB_USER: &str = "BRICKSTORE_DB_USER";
    pub const DB_PASSWORD: &str = "BRICKSTORE_DB_PASSWORD";
    pub const DB_OAUTH_ENDPOINT: &str = "BRICKSTORE_DB_OAUTH_ENDPOINT";
    pub const DB_TOKEN_TTL_SECS: &str = "BRICKSTORE_DB_TOKEN_TTL_SECS";
}

/// How database credentials are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Fixed user/password read from configuration.
    Static,
    /// Short-lived token minted by the identity provider from client credentials.
    Delegated,
}

impl AuthMode {
    /// Delegated iff both client id and client secret are present and non-empty.
    #[must_use]
    pub fn detect(settings: &CredentialSettings) -> Self {
        if settings.client_id().is_some() && settings.client_secret().is_some() {
            Self::Delegated
        } else {
            Self::Static
        }
    }
}

/// The configuration values credential resolution depends on.
///
/// Empty strings are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub host: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<SecretString>,
    pub oauth_endpoint: Option<String>,
}

impl CredentialSettings {
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        non_empty(self.client_id.as_deref())
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<&SecretString> {
        self.client_secret
            .as_ref()
            .filter(|s| !s.expose_secret().is_empty())
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        non_empty(self.host.as_deref())
    }

    /// Endpoint path, trimmed.
    #[must_use]
    pub fn oauth_endpoint(&self) -> Option<&str> {
        non_empty(self.oauth_endpoint.as_deref().map(str::trim))
    }

    #[must_use]
    pub fn db_user(&self) -> &str {
        self.db_user.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn db_password(&self) -> SecretString {
        self.db_password
            .clone()
            .unwrap_or_else(|| SecretString::from(String::new()))
    }

    #[must_use]
    pub fn mode(&self) -> AuthMode {
        AuthMode::detect(self)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Prepend `https://` unless the host already carries a scheme.
#[must_use]
pub fn normalize_host(host: &str) -> String {
    if host.starts_with("http") {
        host.to_owned()
    } else {
        format!("https://{host}")
    }
}
