//! `hotels` table.

use crate::error::store_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_booking_core::{
    ContactInfo, Hotel, HotelId, HotelPatch, HotelRepository, NewHotel, StoreError, StoreResult,
};
use sqlx::PgPool;
use sqlx::types::Json;

const COLUMNS: &str = "id, name, description, location, address, rating, price_per_night, \
                       amenities, images, contact_info, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct HotelRow {
    id: i64,
    name: String,
    description: Option<String>,
    location: String,
    address: String,
    rating: Option<f64>,
    price_per_night: f64,
    amenities: Vec<String>,
    images: Vec<String>,
    contact_info: Option<Json<ContactInfo>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<HotelRow> for Hotel {
    fn from(row: HotelRow) -> Self {
        Self {
            id: HotelId::new(row.id),
            name: row.name,
            description: row.description,
            location: row.location,
            address: row.address,
            rating: row.rating,
            price_per_night: row.price_per_night,
            amenities: row.amenities,
            images: row.images,
            contact_info: row.contact_info.map(|Json(info)| info),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL` hotel directory.
#[derive(Clone, Debug)]
pub struct PostgresHotelRepository {
    pool: PgPool,
}

impl PostgresHotelRepository {
    /// Create a repository over `pool`
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HotelRepository for PostgresHotelRepository {
    async fn list(&self) -> StoreResult<Vec<Hotel>> {
        let rows: Vec<HotelRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM hotels ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("hotels.list"))?;
        Ok(rows.into_iter().map(Hotel::from).collect())
    }

    async fn get(&self, id: HotelId) -> StoreResult<Option<Hotel>> {
        let row: Option<HotelRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM hotels WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("hotels.get"))?;
        Ok(row.map(Hotel::from))
    }

    async fn create(&self, hotel: NewHotel, now: DateTime<Utc>) -> StoreResult<Hotel> {
        let row: HotelRow = sqlx::query_as(&format!(
            r"
            INSERT INTO hotels (
                name, description, location, address, rating, price_per_night,
                amenities, images, contact_info, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {COLUMNS}
            "
        ))
        .bind(&hotel.name)
        .bind(&hotel.description)
        .bind(&hotel.location)
        .bind(&hotel.address)
        .bind(hotel.rating)
        .bind(hotel.price_per_night)
        .bind(&hotel.amenities)
        .bind(&hotel.images)
        .bind(hotel.contact_info.map(Json))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("hotels.create"))?;

        Ok(row.into())
    }

    async fn update(&self, id: HotelId, patch: HotelPatch, now: DateTime<Utc>) -> StoreResult<Hotel> {
        let row: Option<HotelRow> = sqlx::query_as(&format!(
            r"
            UPDATE hotels SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                address = COALESCE($5, address),
                rating = COALESCE($6, rating),
                price_per_night = COALESCE($7, price_per_night),
                amenities = COALESCE($8, amenities),
                images = COALESCE($9, images),
                contact_info = COALESCE($10, contact_info),
                updated_at = $11
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id.get())
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.location)
        .bind(patch.address)
        .bind(patch.rating)
        .bind(patch.price_per_night)
        .bind(patch.amenities)
        .bind(patch.images)
        .bind(patch.contact_info.map(Json))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("hotels.update"))?;

        row.map(Hotel::from)
            .ok_or_else(|| StoreError::not_found("Hotel", id))
    }

    async fn delete(&self, id: HotelId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM hotels WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(store_error("hotels.delete"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Hotel", id));
        }
        Ok(())
    }

    async fn search(&self, location: &str) -> StoreResult<Vec<Hotel>> {
        let pattern = format!("%{}%", escape_like(location.trim()));
        let rows: Vec<HotelRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM hotels WHERE location ILIKE $1 ESCAPE '\\' ORDER BY id"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("hotels.search"))?;
        Ok(rows.into_iter().map(Hotel::from).collect())
    }
}

/// Escape `LIKE` wildcards so the query is matched literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Paris"), "Paris");
    }
}
