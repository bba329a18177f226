use http::StatusCode;
use lakebase_db::DbError;

use super::problem::Problem;
use crate::domain::error::DomainError;

/// Convert domain errors to HTTP Problem responses
pub fn domain_error_to_problem(err: DomainError) -> Problem {
    match err {
        DomainError::NotFound { entity, .. } => Problem::new(
            StatusCode::NOT_FOUND,
            "Not Found",
            format!("{entity} not found"),
        ),

        DomainError::DatabaseNotConfigured => Problem::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable",
            "Database not configured",
        ),

        DomainError::Database(
            e @ (DbError::PoolTimedOut | DbError::PoolClosed | DbError::Credential(_)),
        ) => {
            tracing::warn!(error = %e, "database unavailable");
            Problem::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service Unavailable",
                "Database temporarily unavailable",
            )
        }

        e @ DomainError::Database(_) => {
            tracing::error!(error = %e, "request failed");
            Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "An internal error occurred",
            )
        }
    }
}

/// Implement Into<Problem> for `DomainError` so `?` works in handlers
impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(e)
    }
}
