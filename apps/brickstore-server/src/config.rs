use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::value::Uncased;
use lakebase_auth::config::keys;
use lakebase_auth::{CredentialSettings, DEFAULT_TOKEN_TTL};
use lakebase_db::DbConnConfig;
use serde::Deserialize;

use crate::logging::LogFormat;

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_owned()
}

/// Server configuration.
///
/// Sources, lowest precedence first: built-in defaults, the YAML file given
/// with `--config`, then `BRICKSTORE_*` and `DATABRICKS_*` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub bind_addr: String,
    pub log_format: LogFormat,
    /// Apply schema and seed migrations at startup when a database is configured.
    pub run_migrations: bool,
    pub request_timeout_secs: u64,
    pub token_ttl_secs: u64,
    pub db: DbConnConfig,
    pub credentials: CredentialSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_format: LogFormat::default(),
            run_migrations: true,
            request_timeout_secs: 30,
            token_ttl_secs: DEFAULT_TOKEN_TTL.as_secs(),
            db: DbConnConfig::default(),
            credentials: CredentialSettings::default(),
        }
    }
}

/// Maps typed `BRICKSTORE_*` names (prefix stripped) to config paths.
/// Unknown names are ignored.
fn app_env_key(key: &str) -> Option<&'static str> {
    Some(match key {
        "log_format" => "log_format",
        "run_migrations" => "run_migrations",
        "request_timeout_secs" => "request_timeout_secs",
        "db_token_ttl_secs" => "token_ttl_secs",
        "db_port" => "db.port",
        "db_pool_size" => "db.pool.pool_size",
        "db_max_overflow" => "db.pool.max_overflow",
        "db_acquire_timeout_secs" => "db.pool.acquire_timeout_secs",
        "db_idle_timeout_secs" => "db.pool.idle_timeout_secs",
        "db_pre_ping" => "db.pool.pre_ping",
        _ => return None,
    })
}

/// String settings taken verbatim. `Env` would read `123456` as a number
/// and `[abc]` as an array.
const VERBATIM_ENV: &[(&str, &str)] = &[
    ("BRICKSTORE_BIND_ADDR", "bind_addr"),
    ("BRICKSTORE_DB_HOST", "db.host"),
    ("BRICKSTORE_DB_NAME", "db.name"),
    ("BRICKSTORE_DB_SSLMODE", "db.sslmode"),
    ("BRICKSTORE_DB_APPLICATION_NAME", "db.application_name"),
    (keys::DB_USER, "credentials.db_user"),
    (keys::DB_PASSWORD, "credentials.db_password"),
    (keys::DB_OAUTH_ENDPOINT, "credentials.oauth_endpoint"),
    (keys::CLIENT_ID, "credentials.client_id"),
    (keys::CLIENT_SECRET, "credentials.client_secret"),
    (keys::HOST, "credentials.host"),
];

impl AppConfig {
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = config_file {
            figment = figment.merge(Yaml::file_exact(path));
        }
        let app_env = Env::prefixed("BRICKSTORE_")
            .filter_map(|k| app_env_key(&k.as_str().to_ascii_lowercase()).map(Uncased::from));
        figment = figment.merge(app_env);
        for &(var, path) in VERBATIM_ENV {
            if let Ok(value) = std::env::var(var) {
                figment = figment.merge(Serialized::default(path, value));
            }
        }
        figment
    }

    /// # Errors
    /// Fails when the config file is missing or unreadable, or a value has
    /// the wrong type.
    pub fn load(config_file: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(config_file).extract().map_err(Box::new)
    }
}
