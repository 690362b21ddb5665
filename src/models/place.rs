//! Place identifiers and the incrementally-fetched details structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::GeoPoint;
use crate::hours::DayHours;
use crate::rating::StarIcons;

/// Opaque identifier assigned to a place by the external directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(String);

impl PlaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Fetchable place attributes, named as the directory wire expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceField {
    PlaceId,
    Name,
    Types,
    Location,
    FormattedAddress,
    Photos,
    Url,
    Website,
    FormattedPhoneNumber,
    OpeningHours,
    Rating,
    UserRatingsTotal,
    PriceLevel,
    Reviews,
}

impl PlaceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceField::PlaceId => "place_id",
            PlaceField::Name => "name",
            PlaceField::Types => "types",
            PlaceField::Location => "geometry.location",
            PlaceField::FormattedAddress => "formatted_address",
            PlaceField::Photos => "photo",
            PlaceField::Url => "url",
            PlaceField::Website => "website",
            PlaceField::FormattedPhoneNumber => "formatted_phone_number",
            PlaceField::OpeningHours => "opening_hours",
            PlaceField::Rating => "rating",
            PlaceField::UserRatingsTotal => "user_ratings_total",
            PlaceField::PriceLevel => "price_level",
            PlaceField::Reviews => "review",
        }
    }
}

impl fmt::Display for PlaceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place photo in two render sizes.
#[derive(Debug, Clone, Serialize)]
pub struct Photo {
    pub url_small: String,
    pub url_large: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributions: Vec<String>,
}

/// A user review of a place.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<StarIcons>,
}

/// Incrementally-fetched attribute set for a single place.
///
/// Every field is optional. Merging a fetched record fills in whatever the
/// record carries and leaves the rest untouched; the struct is never
/// replaced wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceDetails {
    pub place_id: PlaceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Primary place type, formatted for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
    /// Marker icon name derived from the primary place type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Compacted opening hours, consecutive identical days merged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<Vec<DayHours>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_reviews: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<Photo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<StarIcons>,
}

impl PlaceDetails {
    /// Create an empty details record for a place id.
    pub fn new(place_id: PlaceId) -> Self {
        Self {
            place_id,
            name: None,
            location: None,
            address: None,
            place_type: None,
            icon: None,
            url: None,
            website: None,
            website_domain: None,
            phone: None,
            opening_hours: None,
            rating: None,
            num_reviews: None,
            price_level: None,
            photos: None,
            reviews: None,
            stars: None,
        }
    }
}

/// Marker icon name for a raw place type; unknown types get the default dot.
pub fn marker_icon(place_type: Option<&str>) -> &'static str {
    match place_type {
        Some("restaurant") | Some("meal_takeaway") => "restaurant",
        Some("cafe") | Some("bakery") => "local_cafe",
        Some("bar") | Some("night_club") => "local_bar",
        Some("lodging") => "hotel",
        Some("park") => "park",
        Some("museum") | Some("art_gallery") => "museum",
        Some("store") | Some("shopping_mall") => "storefront",
        _ => "circle",
    }
}

/// Format a raw place type by capitalizing the first letter and replacing
/// underscores with spaces.
pub fn format_place_type(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().replace('_', " "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_place_type() {
        assert_eq!(format_place_type("meal_takeaway"), "Meal takeaway");
        assert_eq!(format_place_type("cafe"), "Cafe");
        assert_eq!(format_place_type(""), "");
    }

    #[test]
    fn test_marker_icon_defaults_to_circle() {
        assert_eq!(marker_icon(Some("restaurant")), "restaurant");
        assert_eq!(marker_icon(Some("embassy")), "circle");
        assert_eq!(marker_icon(None), "circle");
    }

    #[test]
    fn test_field_wire_names() {
        assert_eq!(PlaceField::Location.as_str(), "geometry.location");
        assert_eq!(PlaceField::Photos.as_str(), "photo");
        assert_eq!(PlaceField::Reviews.as_str(), "review");
    }
}
