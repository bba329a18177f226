use lakebase_auth::AuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A pre-connect interceptor could not produce credentials.
    #[error("credential error: {0}")]
    Credential(#[from] AuthError),

    #[error("timed out waiting for a database connection")]
    PoolTimedOut,

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid database configuration: {0}")]
    Config(String),
}

impl DbError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
