use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::config::DbConnConfig;
use crate::error::DbError;

/// Parameters for one physical connection.
///
/// Interceptors receive a fresh copy before every open and may rewrite any
/// field, typically `password`.
#[derive(Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: SecretString,
    pub sslmode: String,
    pub application_name: Option<String>,
}

impl ConnectParams {
    #[must_use]
    pub fn from_config(config: &DbConnConfig, user: String, password: SecretString) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            database: config.name.clone(),
            user,
            password,
            sslmode: config.sslmode.clone(),
            application_name: config.application_name.clone(),
        }
    }

    /// # Errors
    /// Returns [`DbError::Config`] if `sslmode` is not a libpq ssl mode.
    pub fn to_pg_options(&self) -> Result<PgConnectOptions, DbError> {
        let ssl_mode: PgSslMode = self
            .sslmode
            .parse()
            .map_err(|e| DbError::config(format!("sslmode '{}': {e}", self.sslmode)))?;

        let mut opts = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .ssl_mode(ssl_mode);

        let password = self.password.expose_secret();
        if !password.is_empty() {
            opts = opts.password(password);
        }
        if let Some(app) = &self.application_name {
            opts = opts.application_name(app);
        }
        Ok(opts)
    }

    /// DSN for logs, password masked.
    #[must_use]
    pub fn redacted_dsn(&self) -> String {
        let password = if self.password.expose_secret().is_empty() {
            ""
        } else {
            ":***"
        };
        format!(
            "postgresql://{}{password}@{}:{}/{}?sslmode={}",
            self.user, self.host, self.port, self.database, self.sslmode
        )
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted_dsn())
    }
}
