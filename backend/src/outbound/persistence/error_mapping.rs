//! Diesel and pool error mapping shared by every repository.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

/// Map pool errors to connection failures.
pub(crate) fn map_pool_error(error: PoolError) -> RepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            RepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to repository errors.
///
/// Unique violations become [`RepositoryError::Duplicate`] carrying the
/// constraint name so services can tell which key collided.
pub(crate) fn map_diesel_error(error: DieselError) -> RepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => RepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => RepositoryError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            RepositoryError::duplicate(info.constraint_name().unwrap_or("unique constraint"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RepositoryError::connection("database connection error")
        }
        _ => RepositoryError::query("database error"),
    }
}

/// Map JSON column (de)serialisation failures.
pub(crate) fn map_json_error(error: serde_json::Error) -> RepositoryError {
    RepositoryError::query(format!("invalid json column: {error}"))
}

/// Report a stored value the domain no longer accepts.
pub(crate) fn invalid_column(column: &str, value: &str) -> RepositoryError {
    RepositoryError::query(format!("unexpected {column} value '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::checkout(PoolError::checkout("timed out"))]
    #[case::build(PoolError::build("bad url"))]
    fn pool_errors_are_connection_failures(#[case] error: PoolError) {
        assert!(matches!(
            map_pool_error(error),
            RepositoryError::Connection { .. }
        ));
    }

    #[rstest]
    fn not_found_is_a_query_error() {
        assert!(matches!(
            map_diesel_error(DieselError::NotFound),
            RepositoryError::Query { .. }
        ));
    }

    #[rstest]
    fn rollback_is_a_query_error() {
        assert!(matches!(
            map_diesel_error(DieselError::RollbackTransaction),
            RepositoryError::Query { .. }
        ));
    }
}
