//! Mapping driver errors onto store errors.

use hotel_booking_core::StoreError;

/// Convert a `sqlx` error raised by `operation` into a [`StoreError`].
///
/// Unique violations become `Conflict`; everything else is `Unavailable`.
/// Every failure is logged and counted in `db_errors_total`.
pub(crate) fn store_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        metrics::counter!("db_errors_total", "operation" => operation).increment(1);

        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }

        tracing::error!(operation, error = %err, "Database operation failed");
        StoreError::Unavailable(format!("{operation}: {err}"))
    }
}

/// A stored value that no longer parses, e.g. an unknown status string.
pub(crate) fn corrupt(column: &str, value: &str) -> StoreError {
    tracing::error!(column, value, "Unreadable value in database row");
    StoreError::Unavailable(format!("unreadable {column} value {value:?}"))
}
