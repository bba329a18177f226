use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
    5432
}

fn default_name() -> String {
    "databricks_postgres".to_owned()
}

fn default_sslmode() -> String {
    "require".to_owned()
}

/// Where the database lives. Credentials come from the resolver, not from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbConnConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_sslmode")]
    pub sslmode: String,
    /// Reported to the server as `application_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    #[serde(default)]
    pub pool: PoolConfig,
}

impl Default for DbConnConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            name: default_name(),
            sslmode: default_sslmode(),
            application_name: None,
            pool: PoolConfig::default(),
        }
    }
}

impl DbConnConfig {
    /// A pool can only be built with a host and a user to log in as.
    #[must_use]
    pub fn is_configured(&self, principal: &str) -> bool {
        !self.host.is_empty() && !principal.is_empty()
    }
}

/// Pool sizing and connection hygiene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PoolConfig {
    /// Connections kept open while idle.
    pub pool_size: usize,
    /// Extra connections allowed under load; closed when returned.
    pub max_overflow: usize,
    pub acquire_timeout_secs: u64,
    /// Idle connections older than this are closed instead of reused. `0` disables.
    pub idle_timeout_secs: u64,
    /// Ping idle connections before handing them out.
    pub pre_ping: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            max_overflow: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            pre_ping: true,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn max_connections(&self) -> usize {
        self.pool_size + self.max_overflow
    }

    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
