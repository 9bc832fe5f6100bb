//! Hotel Directory records.

use crate::types::HotelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional contact details of a hotel
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A hotel listed in the directory
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    /// Hotel ID
    pub id: HotelId,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// City or region, used by search
    pub location: String,
    /// Street address
    pub address: String,
    /// Star rating, 0 to 5
    pub rating: Option<f64>,
    /// Nightly price in major units
    pub price_per_night: f64,
    /// Amenity names
    pub amenities: Vec<String>,
    /// Image URLs, in display order
    pub images: Vec<String>,
    /// Contact details
    pub contact_info: Option<ContactInfo>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Hotel {
    /// Case-insensitive substring match on `location`. An empty query matches.
    #[must_use]
    pub fn matches_location(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.location.to_lowercase().contains(&query.to_lowercase())
    }

    /// Apply a patch in place and bump `updated_at`
    pub fn apply(&mut self, patch: HotelPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(rating) = patch.rating {
            self.rating = Some(rating);
        }
        if let Some(price) = patch.price_per_night {
            self.price_per_night = price;
        }
        if let Some(amenities) = patch.amenities {
            self.amenities = amenities;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(contact_info) = patch.contact_info {
            self.contact_info = Some(contact_info);
        }
        self.updated_at = now;
    }
}

/// Fields required to list a hotel
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewHotel {
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// City or region
    pub location: String,
    /// Street address
    pub address: String,
    /// Star rating
    pub rating: Option<f64>,
    /// Nightly price in major units
    pub price_per_night: f64,
    /// Amenity names
    pub amenities: Vec<String>,
    /// Image URLs
    pub images: Vec<String>,
    /// Contact details
    pub contact_info: Option<ContactInfo>,
}

impl NewHotel {
    /// Materialize the record once the store has assigned an id
    #[must_use]
    pub fn into_hotel(self, id: HotelId, now: DateTime<Utc>) -> Hotel {
        Hotel {
            id,
            name: self.name,
            description: self.description,
            location: self.location,
            address: self.address,
            rating: self.rating,
            price_per_night: self.price_per_night,
            amenities: self.amenities,
            images: self.images,
            contact_info: self.contact_info,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a hotel. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HotelPatch {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New address
    pub address: Option<String>,
    /// New rating
    pub rating: Option<f64>,
    /// New nightly price
    pub price_per_night: Option<f64>,
    /// Replacement amenity list
    pub amenities: Option<Vec<String>>,
    /// Replacement image list
    pub images: Option<Vec<String>>,
    /// Replacement contact details
    pub contact_info: Option<ContactInfo>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hotel(location: &str) -> Hotel {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        NewHotel {
            name: "Harbour View".to_string(),
            location: location.to_string(),
            address: "1 Quay St".to_string(),
            price_per_night: 180.0,
            ..NewHotel::default()
        }
        .into_hotel(HotelId::new(1), now)
    }

    #[test]
    fn test_location_match_is_case_insensitive_substring() {
        let h = hotel("San Francisco, CA");
        assert!(h.matches_location("francisco"));
        assert!(h.matches_location("SAN"));
        assert!(h.matches_location(""));
        assert!(!h.matches_location("Oakland"));
    }

    #[test]
    fn test_patch_replaces_lists_and_keeps_the_rest() {
        let mut h = hotel("Lisbon");
        let later = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        h.apply(
            HotelPatch {
                amenities: Some(vec!["wifi".to_string()]),
                price_per_night: Some(200.0),
                ..HotelPatch::default()
            },
            later,
        );
        assert_eq!(h.amenities, vec!["wifi".to_string()]);
        assert_eq!(h.price_per_night, 200.0);
        assert_eq!(h.location, "Lisbon");
        assert_eq!(h.updated_at, later);
    }

    #[test]
    fn test_contact_info_omits_missing_fields() {
        let json = serde_json::to_value(ContactInfo {
            phone: None,
            email: Some("desk@example.com".to_string()),
        })
        .unwrap();
        assert!(json.get("phone").is_none());
        assert_eq!(json["email"], "desk@example.com");
    }
}
