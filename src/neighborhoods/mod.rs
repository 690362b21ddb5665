//! Neighborhood circle lookups.

mod index;

pub use index::{IndexedNeighborhood, NeighborhoodIndex};

use std::sync::Arc;
use tracing::debug;

use crate::models::{GeoPoint, Neighborhood};

/// Lookup service resolving which neighborhood a point falls in.
pub struct NeighborhoodLocator {
    index: NeighborhoodIndex,
    all: Vec<Arc<Neighborhood>>,
}

impl NeighborhoodLocator {
    pub fn new(neighborhoods: Vec<Neighborhood>) -> Self {
        let all: Vec<Arc<Neighborhood>> = neighborhoods.into_iter().map(Arc::new).collect();
        let index = NeighborhoodIndex::build(all.clone());
        Self { index, all }
    }

    /// The neighborhood containing the point; the smallest circle wins when
    /// circles overlap.
    pub fn locate(&self, point: GeoPoint) -> Option<Arc<Neighborhood>> {
        let mut matches = self.index.containing(point);
        debug!(
            lat = point.lat,
            lon = point.lon,
            matches = matches.len(),
            "neighborhood lookup"
        );
        matches.sort_by(|a, b| a.radius_m.total_cmp(&b.radius_m));
        matches.into_iter().next()
    }

    /// The neighborhood whose center is closest to the point.
    pub fn nearest(&self, point: GeoPoint) -> Option<Arc<Neighborhood>> {
        self.index.nearest(point)
    }

    /// Every configured neighborhood, in configuration order (for drawing).
    pub fn all(&self) -> &[Arc<Neighborhood>] {
        &self.all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn philly_neighborhoods() -> Vec<Neighborhood> {
        vec![
            Neighborhood::new("Rittenhouse Square", GeoPoint::new(39.9496, -75.1713), 400.0),
            Neighborhood::new("Old City", GeoPoint::new(39.9504, -75.1449), 500.0),
            Neighborhood::new("Society Hill", GeoPoint::new(39.9443, -75.1494), 500.0),
            Neighborhood::new("Fishtown", GeoPoint::new(39.9729, -75.1255), 600.0),
        ]
    }

    #[test]
    fn test_locate_inside_circle() {
        let locator = NeighborhoodLocator::new(philly_neighborhoods());
        let hit = locator.locate(GeoPoint::new(39.9496, -75.1713)).unwrap();
        assert_eq!(hit.name, "Rittenhouse Square");
    }

    #[test]
    fn test_locate_outside_all_circles() {
        let locator = NeighborhoodLocator::new(philly_neighborhoods());
        // City Hall sits between the configured circles.
        assert!(locator.locate(GeoPoint::new(39.9526, -75.1652)).is_none());
    }

    #[test]
    fn test_smallest_circle_wins_on_overlap() {
        let mut neighborhoods = philly_neighborhoods();
        neighborhoods.push(Neighborhood::new(
            "Center City",
            GeoPoint::new(39.9496, -75.1713),
            2000.0,
        ));
        let locator = NeighborhoodLocator::new(neighborhoods);
        let hit = locator.locate(GeoPoint::new(39.9496, -75.1713)).unwrap();
        assert_eq!(hit.name, "Rittenhouse Square");
    }

    #[test]
    fn test_nearest_center() {
        let locator = NeighborhoodLocator::new(philly_neighborhoods());
        let hit = locator.nearest(GeoPoint::new(39.9700, -75.1300)).unwrap();
        assert_eq!(hit.name, "Fishtown");
    }

    #[test]
    fn test_all_preserves_configuration_order() {
        let locator = NeighborhoodLocator::new(philly_neighborhoods());
        let names: Vec<&str> = locator.all().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            ["Rittenhouse Square", "Old City", "Society Hill", "Fishtown"]
        );
    }
}
