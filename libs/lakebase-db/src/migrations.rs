use sqlx::migrate::Migrator;

use crate::db::Db;
use crate::error::DbError;

/// Catalog schema and seed data, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations on one pooled connection.
///
/// # Errors
/// Returns [`DbError::Migrate`] if a migration fails or the recorded
/// history does not match the embedded files.
pub async fn run_migrations(db: &Db) -> Result<(), DbError> {
    let mut conn = db.conn().await?;
    MIGRATOR.run(&mut *conn).await?;
    tracing::info!(count = MIGRATOR.iter().count(), "database migrations applied");
    Ok(())
}
