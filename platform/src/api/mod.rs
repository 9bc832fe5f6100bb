//! REST resources of the booking platform.
//!
//! One module per service of the deployment topology. Each exposes a
//! `router()` returning a `Router<AppState>` that the server nests under
//! `/api/<service>` when the service is enabled.

pub mod bookings;
pub mod checkout;
pub mod hotels;
pub mod payments;
pub mod reviews;

use hotel_booking_core::{Currency, FieldError, StoreError};
use hotel_booking_web::AppError;
use validator::ValidateUrl;

/// Fail with every collected field error, if there are any.
pub(crate) fn reject_invalid(errors: Vec<FieldError>) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation_failed(errors))
    }
}

/// Map store errors of an update, delete or cancel.
///
/// Writes do not tell a missing record apart from other failures: it answers
/// the opaque 500 with `message`. Lookups keep their 404.
pub(crate) fn write_failed(message: &'static str) -> impl FnOnce(StoreError) -> AppError {
    move |err| match err {
        err @ StoreError::NotFound { .. } => AppError::internal(message).with_source(err),
        other => other.into(),
    }
}

/// One error per image entry that is not an absolute URL.
pub(crate) fn image_url_errors(images: &[String]) -> Vec<FieldError> {
    images
        .iter()
        .enumerate()
        .filter(|(_, url)| !url.validate_url())
        .map(|(index, _)| FieldError::new(format!("images[{index}]"), "must be a valid URL"))
        .collect()
}

/// Resolve an optional currency code, falling back to `default`.
pub(crate) fn resolve_currency(code: Option<&str>, default: Currency) -> Result<Currency, AppError> {
    match code {
        None => Ok(default),
        Some(code) => code
            .parse()
            .map_err(|_| AppError::invalid_field("currency", format!("unsupported currency {code}"))),
    }
}
