//! Error mapping shared by the Diesel deal repository.

use tracing::{debug, warn};

use crate::domain::ports::DealRepositoryError;

use super::models::InvalidRow;
use super::pool::PoolError;

/// Map pool errors to repository connection errors.
pub(crate) fn map_pool_error(error: PoolError) -> DealRepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            DealRepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to repository errors.
///
/// Closed connections are reported as connection failures so callers can
/// answer with a retryable status; everything else is a query failure.
pub(crate) fn map_diesel_error(error: diesel::result::Error) -> DealRepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

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
        DieselError::NotFound => DealRepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => DealRepositoryError::query("database query error"),
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::ClosedConnection => {
                DealRepositoryError::connection("database connection error")
            }
            DatabaseErrorKind::UniqueViolation => {
                DealRepositoryError::query("unique constraint violated")
            }
            DatabaseErrorKind::ForeignKeyViolation => {
                warn!(
                    message = info.message(),
                    constraint_name = ?info.constraint_name(),
                    "foreign key violation"
                );
                DealRepositoryError::query("foreign key violation")
            }
            _ => DealRepositoryError::query("database error"),
        },
        _ => DealRepositoryError::query("database error"),
    }
}

/// Report a row that no longer satisfies the domain invariants.
pub(crate) fn map_invalid_row(error: impl std::fmt::Display) -> DealRepositoryError {
    warn!(%error, "stored row rejected");
    DealRepositoryError::query(error.to_string())
}

impl From<InvalidRow> for DealRepositoryError {
    fn from(error: InvalidRow) -> Self {
        map_invalid_row(error)
    }
}
