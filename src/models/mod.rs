//! Core data models for the discovery widget.

pub mod geo;
pub mod neighborhood;
pub mod place;

pub use geo::{GeoBounds, GeoPoint};
pub use neighborhood::Neighborhood;
pub use place::{format_place_type, marker_icon, Photo, PlaceDetails, PlaceField, PlaceId, Review};
