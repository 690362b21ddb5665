//! Named neighborhood circles drawn over the map.

use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// A neighborhood rendered as a labelled circle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighborhood {
    pub name: String,
    pub center: GeoPoint,
    /// Circle radius in meters.
    pub radius_m: f64,
}

impl Neighborhood {
    pub fn new(name: impl Into<String>, center: GeoPoint, radius_m: f64) -> Self {
        Self {
            name: name.into(),
            center,
            radius_m,
        }
    }

    /// Whether the point falls inside this neighborhood's circle.
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.center.distance_m(&point) <= self.radius_m
    }
}
