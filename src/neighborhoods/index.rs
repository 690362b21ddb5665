//! Spatial index for neighborhood circle lookups.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::info;

use crate::models::{GeoBounds, GeoPoint, Neighborhood};

/// Wrapper for R-tree indexing of neighborhood circles.
#[derive(Clone)]
pub struct IndexedNeighborhood {
    pub neighborhood: Arc<Neighborhood>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedNeighborhood {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedNeighborhood {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.neighborhood.center.lon - point[0];
        let dy = self.neighborhood.center.lat - point[1];
        dx * dx + dy * dy
    }
}

impl IndexedNeighborhood {
    pub fn new(neighborhood: Arc<Neighborhood>) -> Self {
        let bounds = GeoBounds::around(neighborhood.center, neighborhood.radius_m);
        Self {
            neighborhood,
            envelope: AABB::from_corners(
                [bounds.min_lon, bounds.min_lat],
                [bounds.max_lon, bounds.max_lat],
            ),
        }
    }
}

/// R-tree over neighborhood circles, queried in lon/lat order.
pub struct NeighborhoodIndex {
    tree: RTree<IndexedNeighborhood>,
}

impl NeighborhoodIndex {
    /// Build the spatial index from neighborhood circles.
    pub fn build(neighborhoods: Vec<Arc<Neighborhood>>) -> Self {
        info!(
            "Building spatial index for {} neighborhoods...",
            neighborhoods.len()
        );
        let indexed: Vec<IndexedNeighborhood> = neighborhoods
            .into_iter()
            .map(IndexedNeighborhood::new)
            .collect();
        let tree = RTree::bulk_load(indexed);
        Self { tree }
    }

    /// All neighborhoods whose circle contains the point.
    ///
    /// The R-tree narrows to envelope candidates; exact containment is
    /// checked with great-circle distance.
    pub fn containing(&self, point: GeoPoint) -> Vec<Arc<Neighborhood>> {
        let query = AABB::from_point([point.lon, point.lat]);
        self.tree
            .locate_in_envelope_intersecting(&query)
            .filter(|indexed| indexed.neighborhood.contains(point))
            .map(|indexed| Arc::clone(&indexed.neighborhood))
            .collect()
    }

    /// The neighborhood whose center is closest to the point.
    pub fn nearest(&self, point: GeoPoint) -> Option<Arc<Neighborhood>> {
        self.tree
            .nearest_neighbor(&[point.lon, point.lat])
            .map(|indexed| Arc::clone(&indexed.neighborhood))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
