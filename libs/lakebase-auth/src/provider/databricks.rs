use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{DatabaseCredential, IdentityProvider, ProviderSession};
use crate::error::ProviderError;

const TOKEN_PATH: &str = "/oidc/v1/token";
const CREDENTIALS_PATH: &str = "/api/2.0/postgres/credentials";
const WORKSPACE_SCOPE: &str = "all-apis";

/// Databricks workspace identity provider (OAuth machine-to-machine).
#[derive(Debug, Clone)]
pub struct DatabricksIdentityProvider {
    http: reqwest::Client,
}

impl DatabricksIdentityProvider {
    /// # Errors
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be built.
    pub fn new(request_timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::transport(e.to_string()))?;
        Ok(Self { http })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Deserialize)]
struct CredentialResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expire_time: Option<DateTime<Utc>>,
}

#[async_trait]
impl IdentityProvider for DatabricksIdentityProvider {
    async fn create_session(
        &self,
        host: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<Box<dyn ProviderSession>, ProviderError> {
        let host = host.trim_end_matches('/').to_owned();
        let url = format!("{host}{TOKEN_PATH}");
        debug!(%url, client_id, "requesting workspace access token");

        let resp = self
            .http
            .post(&url)
            .basic_auth(client_id, Some(client_secret.expose_secret()))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", WORKSPACE_SCOPE),
            ])
            .send()
            .await?;
        let body: TokenResponse = read_json(resp).await?;

        if body.access_token.is_empty() {
            return Err(ProviderError::malformed("token response has no access_token"));
        }

        Ok(Box::new(DatabricksSession {
            http: self.http.clone(),
            host,
            access_token: SecretString::from(body.access_token),
        }))
    }
}

struct DatabricksSession {
    http: reqwest::Client,
    host: String,
    access_token: SecretString,
}

#[async_trait]
impl ProviderSession for DatabricksSession {
    async fn generate_database_credential(
        &self,
        endpoint: &str,
    ) -> Result<DatabaseCredential, ProviderError> {
        let url = format!("{}{CREDENTIALS_PATH}", self.host);
        debug!(%url, endpoint, "generating database credential");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&serde_json::json!({ "endpoint": endpoint }))
            .send()
            .await?;
        let body: CredentialResponse = read_json(resp).await?;

        let token = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::malformed("credential response has no token"))?;

        Ok(DatabaseCredential {
            token: SecretString::from(token),
            expire_time: body.expire_time,
        })
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json::<T>().await?)
}
