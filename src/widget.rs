//! The neighborhood discovery widget engine.
//!
//! One instance owns everything the panel shows: the configured POI list
//! and its pagination cursor, the details cache, the search-result cache,
//! and the current selection. The host renders from the values these
//! operations return; nothing here touches a presentation layer.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Capabilities, Config};
use crate::details::{AbortToken, DetailsFetcher, FetchError};
use crate::directory::{DirectoryError, FindRequest, PlaceDirectory, PlaceRecord};
use crate::models::{GeoBounds, GeoPoint, Neighborhood, PlaceDetails, PlaceField, PlaceId};
use crate::neighborhoods::NeighborhoodLocator;

/// Fields every result card needs regardless of capabilities.
const CARD_BASE_FIELDS: &[PlaceField] =
    &[PlaceField::Name, PlaceField::Types, PlaceField::Location];

/// Fields fetched for places shown in the results list.
fn card_fields(capabilities: &Capabilities) -> Vec<PlaceField> {
    let mut fields = CARD_BASE_FIELDS.to_vec();
    if capabilities.thumbnails {
        fields.push(PlaceField::Photos);
    }
    if capabilities.atmospheres {
        fields.extend([
            PlaceField::Rating,
            PlaceField::UserRatingsTotal,
            PlaceField::PriceLevel,
        ]);
    }
    fields
}

/// Fields fetched when a place is selected for the details panel.
fn detail_fields(capabilities: &Capabilities) -> Vec<PlaceField> {
    let mut fields = vec![
        PlaceField::Name,
        PlaceField::Types,
        PlaceField::Location,
        PlaceField::FormattedAddress,
        PlaceField::Url,
        PlaceField::OpeningHours,
    ];
    if capabilities.thumbnails {
        fields.push(PlaceField::Photos);
    }
    if capabilities.contacts {
        fields.extend([PlaceField::Website, PlaceField::FormattedPhoneNumber]);
    }
    if capabilities.atmospheres {
        fields.extend([
            PlaceField::Rating,
            PlaceField::UserRatingsTotal,
            PlaceField::PriceLevel,
            PlaceField::Reviews,
        ]);
    }
    fields
}

/// Errors from widget operations.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("search capability is disabled")]
    SearchDisabled,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A hydrated page of results plus the viewport that fits everything shown.
#[derive(Debug, Clone)]
pub struct PlacePage {
    pub places: Vec<PlaceDetails>,
    /// Index of the first entry within the configured POI list.
    pub start_index: usize,
    /// Whether another page remains.
    pub has_more: bool,
    /// Box containing the map center and every place shown so far.
    pub bounds: GeoBounds,
}

/// Outcome of selecting a place.
#[derive(Debug, Clone)]
pub struct Selection {
    pub details: PlaceDetails,
    /// Where the host should pan the map, when the place has coordinates.
    pub pan_to: Option<GeoPoint>,
    /// Whether the place is one of the paged results. Off-list selections
    /// get the loose selection marker instead of a card marker.
    pub in_results: bool,
}

/// State and operations behind the neighborhood discovery panel.
pub struct NeighborhoodDiscovery<D> {
    center: GeoPoint,
    capabilities: Capabilities,
    poi_min_zoom: u8,
    search_radius_m: f64,
    initial_count: usize,
    show_more_count: usize,
    places: Vec<PlaceId>,
    next_place_index: usize,
    selected_place_id: Option<PlaceId>,
    search_results: HashMap<PlaceId, PlaceRecord>,
    fetcher: DetailsFetcher<D>,
    neighborhoods: NeighborhoodLocator,
}

impl<D: PlaceDirectory> NeighborhoodDiscovery<D> {
    pub fn new(config: Config, directory: D) -> Self {
        info!(
            pois = config.pois.len(),
            neighborhoods = config.neighborhoods.len(),
            "initializing neighborhood discovery widget"
        );
        Self {
            center: config.map.center,
            capabilities: config.capabilities,
            poi_min_zoom: config.map.poi_min_zoom,
            search_radius_m: config.map.search_radius_m,
            initial_count: config.pagination.initial_count,
            show_more_count: config.pagination.show_more_count,
            places: config
                .pois
                .into_iter()
                .map(|poi| PlaceId::new(poi.place_id))
                .collect(),
            next_place_index: 0,
            selected_place_id: None,
            search_results: HashMap::new(),
            fetcher: DetailsFetcher::new(directory),
            neighborhoods: NeighborhoodLocator::new(config.neighborhoods),
        }
    }

    /// Hydrate and return the next page of configured POIs: the initial
    /// page size on the first call, the show-more size afterwards.
    pub async fn show_more(&mut self) -> Result<PlacePage, WidgetError> {
        let count = if self.next_place_index == 0 {
            self.initial_count
        } else {
            self.show_more_count
        };
        self.show_next_places(count).await
    }

    async fn show_next_places(&mut self, count: usize) -> Result<PlacePage, WidgetError> {
        let start_index = self.next_place_index;
        let end = (start_index + count).min(self.places.len());
        let next: Vec<PlaceId> = self.places[start_index..end].to_vec();
        if next.is_empty() {
            return Ok(PlacePage {
                places: Vec::new(),
                start_index,
                has_more: false,
                bounds: self.shown_bounds(start_index),
            });
        }

        let fields = card_fields(&self.capabilities);
        let plans: Vec<(PlaceId, Vec<PlaceField>)> = next
            .iter()
            .map(|id| (id.clone(), self.fetcher.missing_fields(id, &fields)))
            .collect();

        // One request per place for exactly its missing fields. Distinct
        // places are independent and hydrate concurrently.
        let fetcher = &self.fetcher;
        let fetched = future::join_all(
            plans
                .iter()
                .filter(|(_, missing)| !missing.is_empty())
                .map(|(id, missing)| async move {
                    (id.clone(), missing.clone(), fetcher.request(id, missing).await)
                }),
        )
        .await;

        for (id, missing, result) in fetched {
            let record = result?;
            self.fetcher.merge(&id, record, &missing);
        }
        self.next_place_index = end;
        debug!(start_index, count = next.len(), "hydrated result page");

        let places = next
            .iter()
            .filter_map(|id| self.fetcher.cache().get(id).cloned())
            .collect();
        Ok(PlacePage {
            places,
            start_index,
            has_more: self.next_place_index < self.places.len(),
            bounds: self.shown_bounds(self.next_place_index),
        })
    }

    /// Viewport containing the center and every place shown so far.
    fn shown_bounds(&self, shown: usize) -> GeoBounds {
        let mut bounds = GeoBounds::from_point(self.center);
        for id in &self.places[..shown.min(self.places.len())] {
            if let Some(location) = self.fetcher.cache().get(id).and_then(|d| d.location) {
                bounds.extend(location);
            }
        }
        bounds
    }

    /// Select a place, fetching its detail fields. Selecting the already
    /// selected place is a no-op and returns `None`.
    pub async fn select_place(&mut self, id: &PlaceId) -> Result<Option<Selection>, WidgetError> {
        if self.selected_place_id.as_ref() == Some(id) {
            debug!(place_id = %id, "place already selected");
            return Ok(None);
        }
        let fields = detail_fields(&self.capabilities);
        let details = self.fetcher.fetch(id, &fields).await?.clone();
        self.selected_place_id = Some(id.clone());
        let in_results = self.places[..self.next_place_index].contains(id);
        Ok(Some(Selection {
            pan_to: details.location,
            in_results,
            details,
        }))
    }

    /// Drop the current selection (details panel closed).
    pub fn clear_selection(&mut self) {
        self.selected_place_id = None;
    }

    pub fn selected_place(&self) -> Option<&PlaceId> {
        self.selected_place_id.as_ref()
    }

    /// Search for a place near the widget center and select the result.
    pub async fn search(&mut self, query: &str) -> Result<Option<Selection>, WidgetError> {
        if !self.capabilities.search {
            return Err(WidgetError::SearchDisabled);
        }
        let request = FindRequest {
            query: query.to_string(),
            bounds: GeoBounds::around(self.center, self.search_radius_m),
        };
        let record = self
            .fetcher
            .directory()
            .find_place(&request)
            .await
            .map_err(FetchError::from)?;
        let Some(id) = record.place_id.clone() else {
            return Err(FetchError::from(DirectoryError::Status(
                "search result without place id".to_string(),
            ))
            .into());
        };
        info!(place_id = %id, query, "search matched place");

        // A search result arrives fully hydrated; seed the cache so the
        // follow-up selection issues no directory calls.
        let fields = detail_fields(&self.capabilities);
        self.fetcher.merge(&id, record.clone(), &fields);
        self.search_results.insert(id.clone(), record);
        self.select_place(&id).await
    }

    /// Raw record from an earlier search, if the place came from one.
    pub fn search_result(&self, id: &PlaceId) -> Option<&PlaceRecord> {
        self.search_results.get(id)
    }

    /// Whether the map's own POI pins should be visible at `zoom` (hidden
    /// below the configured minimum to reduce clutter).
    pub fn poi_pins_visible(&self, zoom: u8) -> bool {
        zoom >= self.poi_min_zoom
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    /// Cached details for a place, if any fields have been fetched.
    pub fn place_details(&self, id: &PlaceId) -> Option<&PlaceDetails> {
        self.fetcher.cache().get(id)
    }

    /// Token that aborts in-flight fetch retries; cloned by hosts that
    /// need to tear the widget down from elsewhere.
    pub fn abort_token(&self) -> AbortToken {
        self.fetcher.abort_token()
    }

    /// Every configured neighborhood, for circle rendering.
    pub fn neighborhoods(&self) -> &[Arc<Neighborhood>] {
        self.neighborhoods.all()
    }

    /// The neighborhood containing a point, if any (circle hit-testing).
    pub fn neighborhood_at(&self, point: GeoPoint) -> Option<Arc<Neighborhood>> {
        self.neighborhoods.locate(point)
    }
}

impl<D> Drop for NeighborhoodDiscovery<D> {
    fn drop(&mut self) {
        self.fetcher.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::config::{MapConfig, PaginationConfig, PoiConfig};
    use crate::directory::DetailsRequest;

    /// Directory double answering every details request with a full record
    /// whose location is derived from the numeric id suffix.
    struct CountingDirectory {
        details_calls: AtomicU32,
        find_calls: AtomicU32,
        last_fields: Mutex<Option<Vec<PlaceField>>>,
    }

    impl CountingDirectory {
        fn new() -> Self {
            Self {
                details_calls: AtomicU32::new(0),
                find_calls: AtomicU32::new(0),
                last_fields: Mutex::new(None),
            }
        }

        fn details_calls(&self) -> u32 {
            self.details_calls.load(Ordering::Relaxed)
        }

        fn find_calls(&self) -> u32 {
            self.find_calls.load(Ordering::Relaxed)
        }
    }

    fn record_for(id: &PlaceId) -> PlaceRecord {
        let suffix: f64 = id
            .as_str()
            .rsplit('-')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);
        PlaceRecord {
            place_id: Some(id.clone()),
            name: Some(format!("Place {}", id)),
            types: Some(vec!["cafe".to_string()]),
            location: Some(GeoPoint::new(39.90 + suffix * 0.01, -75.20 + suffix * 0.01)),
            rating: Some(4.0),
            user_ratings_total: Some(100),
            ..PlaceRecord::default()
        }
    }

    #[async_trait]
    impl PlaceDirectory for CountingDirectory {
        async fn get_details(
            &self,
            request: &DetailsRequest,
        ) -> Result<PlaceRecord, DirectoryError> {
            self.details_calls.fetch_add(1, Ordering::Relaxed);
            *self.last_fields.lock().unwrap() = Some(request.fields.clone());
            Ok(record_for(&request.place_id))
        }

        async fn find_place(&self, _request: &FindRequest) -> Result<PlaceRecord, DirectoryError> {
            self.find_calls.fetch_add(1, Ordering::Relaxed);
            Ok(record_for(&PlaceId::from("poi-9")))
        }
    }

    fn config_with_pois(count: usize) -> Config {
        Config {
            map: MapConfig {
                center: GeoPoint::new(39.9526, -75.1652),
                zoom: 12,
                min_zoom: 3,
                max_zoom: 20,
                poi_min_zoom: 18,
                search_radius_m: 1000.0,
            },
            capabilities: Capabilities::default(),
            pagination: PaginationConfig::default(),
            pois: (0..count)
                .map(|i| PoiConfig {
                    place_id: format!("poi-{}", i),
                })
                .collect(),
            neighborhoods: vec![Neighborhood::new(
                "Rittenhouse Square",
                GeoPoint::new(39.9496, -75.1713),
                400.0,
            )],
        }
    }

    #[tokio::test]
    async fn test_pagination_walks_configured_pois() {
        let mut widget = NeighborhoodDiscovery::new(config_with_pois(7), CountingDirectory::new());

        let first = widget.show_more().await.unwrap();
        assert_eq!(first.places.len(), 5);
        assert_eq!(first.start_index, 0);
        assert!(first.has_more);

        let second = widget.show_more().await.unwrap();
        assert_eq!(second.places.len(), 2);
        assert_eq!(second.start_index, 5);
        assert!(!second.has_more);

        let third = widget.show_more().await.unwrap();
        assert!(third.places.is_empty());
        assert!(!third.has_more);

        assert_eq!(widget.fetcher.directory().details_calls(), 7);
    }

    #[tokio::test]
    async fn test_page_bounds_cover_center_and_places() {
        let mut widget = NeighborhoodDiscovery::new(config_with_pois(3), CountingDirectory::new());
        let page = widget.show_more().await.unwrap();

        assert!(page.bounds.contains(widget.center()));
        for place in &page.places {
            assert!(page.bounds.contains(place.location.unwrap()));
        }
    }

    #[tokio::test]
    async fn test_reselecting_same_place_is_noop() {
        let mut widget = NeighborhoodDiscovery::new(config_with_pois(1), CountingDirectory::new());
        let id = PlaceId::from("poi-0");

        let selection = widget.select_place(&id).await.unwrap();
        assert!(selection.is_some());
        let calls = widget.fetcher.directory().details_calls();

        assert!(widget.select_place(&id).await.unwrap().is_none());
        assert_eq!(widget.fetcher.directory().details_calls(), calls);
    }

    #[tokio::test]
    async fn test_select_after_page_requests_only_detail_fields() {
        let mut widget = NeighborhoodDiscovery::new(config_with_pois(5), CountingDirectory::new());
        widget.show_more().await.unwrap();
        assert_eq!(widget.fetcher.directory().details_calls(), 5);

        let id = PlaceId::from("poi-0");
        let selection = widget.select_place(&id).await.unwrap().unwrap();
        assert!(selection.in_results);
        assert_eq!(widget.fetcher.directory().details_calls(), 6);

        // Card fields were already cached; the follow-up asks only for the
        // detail-panel extras.
        let last = widget
            .fetcher
            .directory()
            .last_fields
            .lock()
            .unwrap()
            .clone()
            .unwrap();
        assert!(!last.contains(&PlaceField::Name));
        assert!(last.contains(&PlaceField::FormattedAddress));
        assert!(last.contains(&PlaceField::Reviews));
    }

    #[tokio::test]
    async fn test_off_list_selection_flagged_for_loose_marker() {
        let mut widget = NeighborhoodDiscovery::new(config_with_pois(2), CountingDirectory::new());
        let selection = widget
            .select_place(&PlaceId::from("poi-7"))
            .await
            .unwrap()
            .unwrap();
        assert!(!selection.in_results);
        assert!(selection.pan_to.is_some());
    }

    #[tokio::test]
    async fn test_search_seeds_cache_and_selects_without_detail_calls() {
        let mut widget = NeighborhoodDiscovery::new(config_with_pois(2), CountingDirectory::new());

        let selection = widget.search("market").await.unwrap().unwrap();
        let id = PlaceId::from("poi-9");
        assert_eq!(selection.details.place_id, id);
        assert_eq!(widget.fetcher.directory().find_calls(), 1);
        // The search result covered every detail field.
        assert_eq!(widget.fetcher.directory().details_calls(), 0);
        assert!(widget.search_result(&id).is_some());
        assert_eq!(widget.selected_place(), Some(&id));
    }

    #[tokio::test]
    async fn test_search_disabled_by_capability() {
        let mut config = config_with_pois(1);
        config.capabilities.search = false;
        let mut widget = NeighborhoodDiscovery::new(config, CountingDirectory::new());

        assert!(matches!(
            widget.search("market").await,
            Err(WidgetError::SearchDisabled)
        ));
        assert_eq!(widget.fetcher.directory().find_calls(), 0);
    }

    #[tokio::test]
    async fn test_clear_selection() {
        let mut widget = NeighborhoodDiscovery::new(config_with_pois(1), CountingDirectory::new());
        let id = PlaceId::from("poi-0");
        widget.select_place(&id).await.unwrap();
        assert!(widget.selected_place().is_some());

        widget.clear_selection();
        assert!(widget.selected_place().is_none());
        // Re-selecting after a clear fetches nothing new; the cache kept
        // every field.
        let calls = widget.fetcher.directory().details_calls();
        widget.select_place(&id).await.unwrap();
        assert_eq!(widget.fetcher.directory().details_calls(), calls);
    }

    #[tokio::test]
    async fn test_poi_pin_visibility_threshold() {
        let widget = NeighborhoodDiscovery::new(config_with_pois(0), CountingDirectory::new());
        assert!(!widget.poi_pins_visible(17));
        assert!(widget.poi_pins_visible(18));
    }

    #[tokio::test]
    async fn test_neighborhood_hit_testing() {
        let widget = NeighborhoodDiscovery::new(config_with_pois(0), CountingDirectory::new());
        assert_eq!(widget.neighborhoods().len(), 1);
        let hit = widget.neighborhood_at(GeoPoint::new(39.9496, -75.1713)).unwrap();
        assert_eq!(hit.name, "Rittenhouse Square");
        assert!(widget
            .neighborhood_at(GeoPoint::new(40.1, -75.0))
            .is_none());
    }
}
