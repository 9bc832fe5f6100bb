//! Hotel Directory endpoints.
//!
//! - GET /api/hotels - List hotels
//! - GET /api/hotels/search?location= - Case-insensitive location search
//! - GET /api/hotels/:id - Hotel details
//! - POST /api/hotels - Create a hotel
//! - PUT /api/hotels/:id - Partial update
//! - DELETE /api/hotels/:id - Delete a hotel

use super::{image_url_errors, reject_invalid, write_failed};
use crate::server::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use hotel_booking_core::{ContactInfo, Hotel, HotelId, HotelPatch, NewHotel};
use hotel_booking_web::{AppError, ValidatedJson};
use serde::Deserialize;
use validator::Validate;

// ============================================================================
// Request Types
// ============================================================================

/// Contact details as sent by clients.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfoRequest {
    /// Phone number
    pub phone: Option<String>,
    /// Contact email
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
}

impl From<ContactInfoRequest> for ContactInfo {
    fn from(request: ContactInfoRequest) -> Self {
        Self {
            phone: request.phone,
            email: request.email,
        }
    }
}

/// Request to create a hotel.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateHotelRequest {
    /// Display name
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// City or region, matched by search
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    /// Street address
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    /// Star rating
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: Option<f64>,
    /// Nightly price in major units
    #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
    pub price_per_night: f64,
    /// Amenity labels
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,
    /// Contact details
    #[validate(nested)]
    pub contact_info: Option<ContactInfoRequest>,
}

impl From<CreateHotelRequest> for NewHotel {
    fn from(request: CreateHotelRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            location: request.location,
            address: request.address,
            rating: request.rating,
            price_per_night: request.price_per_night,
            amenities: request.amenities,
            images: request.images,
            contact_info: request.contact_info.map(ContactInfo::from),
        }
    }
}

/// Partial hotel update; absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHotelRequest {
    /// Display name
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// City or region
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: Option<String>,
    /// Street address
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: Option<String>,
    /// Star rating
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: Option<f64>,
    /// Nightly price in major units
    #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
    pub price_per_night: Option<f64>,
    /// Amenity labels
    pub amenities: Option<Vec<String>>,
    /// Image URLs
    pub images: Option<Vec<String>>,
    /// Contact details
    #[validate(nested)]
    pub contact_info: Option<ContactInfoRequest>,
}

impl From<UpdateHotelRequest> for HotelPatch {
    fn from(request: UpdateHotelRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            location: request.location,
            address: request.address,
            rating: request.rating,
            price_per_night: request.price_per_night,
            amenities: request.amenities,
            images: request.images,
            contact_info: request.contact_info.map(ContactInfo::from),
        }
    }
}

/// Search parameters.
///
/// `checkIn`, `checkOut` and `guests` are accepted for client compatibility
/// but do not filter results.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Location fragment
    pub location: Option<String>,
    /// Desired arrival
    pub check_in: Option<String>,
    /// Desired departure
    pub check_out: Option<String>,
    /// Party size
    pub guests: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Routes mounted at `/api/hotels`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_hotels).post(create_hotel))
        .route("/search", get(search_hotels))
        .route("/:id", get(get_hotel).put(update_hotel).delete(delete_hotel))
}

/// List every hotel.
pub async fn list_hotels(State(state): State<AppState>) -> Result<Json<Vec<Hotel>>, AppError> {
    Ok(Json(state.hotels.list().await?))
}

/// Hotels whose location contains the query, ignoring case.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/hotels/search?location=lisbon"
/// ```
pub async fn search_hotels(
    Query(query): Query<SearchQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Hotel>>, AppError> {
    let location = query.location.unwrap_or_default();
    let hotels = state.hotels.search(location.trim()).await?;

    tracing::debug!(location = %location, matches = hotels.len(), "Hotel search");
    Ok(Json(hotels))
}

/// Hotel details.
pub async fn get_hotel(
    Path(id): Path<HotelId>,
    State(state): State<AppState>,
) -> Result<Json<Hotel>, AppError> {
    state
        .hotels
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Hotel", id))
}

/// Create a hotel.
pub async fn create_hotel(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateHotelRequest>,
) -> Result<(StatusCode, Json<Hotel>), AppError> {
    reject_invalid(image_url_errors(&request.images))?;

    let hotel = state.hotels.create(request.into(), state.clock.now()).await?;

    tracing::info!(hotel_id = %hotel.id, name = %hotel.name, "Hotel created");
    Ok((StatusCode::CREATED, Json(hotel)))
}

/// Apply a partial update.
pub async fn update_hotel(
    Path(id): Path<HotelId>,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateHotelRequest>,
) -> Result<Json<Hotel>, AppError> {
    if let Some(images) = &request.images {
        reject_invalid(image_url_errors(images))?;
    }

    let hotel = state
        .hotels
        .update(id, request.into(), state.clock.now())
        .await
        .map_err(write_failed("Failed to update hotel"))?;

    tracing::info!(hotel_id = %hotel.id, "Hotel updated");
    Ok(Json(hotel))
}

/// Delete a hotel.
pub async fn delete_hotel(
    Path(id): Path<HotelId>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .hotels
        .delete(id)
        .await
        .map_err(write_failed("Failed to delete hotel"))?;

    tracing::info!(hotel_id = %id, "Hotel deleted");
    Ok(StatusCode::NO_CONTENT)
}
