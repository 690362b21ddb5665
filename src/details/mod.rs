//! Field-aware place-details fetching with caching and bounded retry.
//!
//! Contract: given a place id and a requested field set, resolve a details
//! object containing at least those fields, contacting the directory only
//! for the fields not already cached. A place's fetched-field set only
//! grows; once a field is fetched it is never re-fetched or invalidated
//! within a session.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::directory::{
    DetailsRequest, DirectoryError, PlaceDirectory, PlaceRecord, ReviewRecord,
};
use crate::hours;
use crate::models::{format_place_type, marker_icon, PlaceDetails, PlaceField, PlaceId, Review};
use crate::rating::StarIcons;

pub mod retry;

pub use retry::{RetryDecision, RetryPolicy};

/// Maximum number of photos kept on a place.
pub const MAX_PLACE_PHOTOS: usize = 6;

/// Shared flag that stops in-flight retry waits when the owning widget
/// goes away, so no backoff timer outlives it.
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort; pending fetches stop at their next check.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Errors surfaced by a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The owning widget was torn down while the fetch was in flight.
    #[error("fetch aborted")]
    Aborted,
    /// Still throttled after the retry budget was spent.
    #[error("rate limited after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// One place's cached details plus the record of fields already retrieved.
#[derive(Debug, Clone)]
pub struct CachedPlace {
    pub details: PlaceDetails,
    fetched: HashSet<PlaceField>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CachedPlace {
    fn new(place_id: PlaceId) -> Self {
        let mut fetched = HashSet::new();
        // The id is known by construction and never requested.
        fetched.insert(PlaceField::PlaceId);
        Self {
            details: PlaceDetails::new(place_id),
            fetched,
            fetched_at: None,
        }
    }

    pub fn has_fetched(&self, field: PlaceField) -> bool {
        self.fetched.contains(&field)
    }

    pub fn fetched_fields(&self) -> &HashSet<PlaceField> {
        &self.fetched
    }
}

/// Per-widget cache of place id → incrementally fetched details.
#[derive(Debug, Default)]
pub struct DetailsCache {
    places: HashMap<PlaceId, CachedPlace>,
}

impl DetailsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PlaceId) -> Option<&PlaceDetails> {
        self.places.get(id).map(|cached| &cached.details)
    }

    pub fn get_cached(&self, id: &PlaceId) -> Option<&CachedPlace> {
        self.places.get(id)
    }

    /// Cached details for `id`, creating an empty entry if none exists yet.
    pub fn ensure(&mut self, id: &PlaceId) -> &PlaceDetails {
        &self
            .places
            .entry(id.clone())
            .or_insert_with(|| CachedPlace::new(id.clone()))
            .details
    }

    /// Requested fields not yet fetched for `id`, in request order.
    pub fn missing_fields(&self, id: &PlaceId, requested: &[PlaceField]) -> Vec<PlaceField> {
        match self.places.get(id) {
            Some(cached) => requested
                .iter()
                .copied()
                .filter(|field| !cached.fetched.contains(field))
                .collect(),
            None => requested.to_vec(),
        }
    }

    /// Merge a fetched record into the cached place and mark `fields` as
    /// fetched. Fields absent from the record stay as they were.
    pub fn merge(
        &mut self,
        id: &PlaceId,
        record: PlaceRecord,
        fields: &[PlaceField],
    ) -> &PlaceDetails {
        let cached = self
            .places
            .entry(id.clone())
            .or_insert_with(|| CachedPlace::new(id.clone()));
        apply_record(&mut cached.details, record);
        cached.fetched.extend(fields.iter().copied());
        cached.fetched_at = Some(Utc::now());
        &cached.details
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

/// Merge a fetched record into a details object, recomputing the derived
/// presentation fields the record touches.
fn apply_record(details: &mut PlaceDetails, record: PlaceRecord) {
    if let Some(name) = record.name {
        details.name = Some(name);
    }
    if let Some(location) = record.location {
        details.location = Some(location);
    }
    if let Some(address) = record.formatted_address {
        details.address = Some(address);
    }
    if let Some(photos) = record.photos {
        details.photos = Some(photos.into_iter().take(MAX_PLACE_PHOTOS).collect());
    }
    if let Some(types) = record.types {
        if let Some(primary) = types.first() {
            details.place_type = Some(format_place_type(primary));
            details.icon = Some(marker_icon(Some(primary)));
        }
    }
    if let Some(url) = record.url {
        details.url = Some(url);
    }
    if let Some(website) = record.website {
        details.website_domain = Url::parse(&website)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .or_else(|| details.website_domain.take());
        details.website = Some(website);
    }
    if let Some(phone) = record.formatted_phone_number {
        details.phone = Some(phone);
    }
    if let Some(weekday_text) = record.weekday_text {
        details.opening_hours = Some(hours::compact_weekday_text(&weekday_text));
    }
    if let Some(rating) = record.rating {
        details.rating = Some(rating);
    }
    if let Some(total) = record.user_ratings_total {
        details.num_reviews = Some(total);
    }
    if let Some(level) = record.price_level {
        details.price_level = Some(level);
    }
    if let Some(reviews) = record.reviews {
        details.reviews = Some(reviews.into_iter().map(review_from_record).collect());
    }
    details.stars = details.rating.and_then(StarIcons::from_rating);
}

fn review_from_record(record: ReviewRecord) -> Review {
    Review {
        stars: record.rating.and_then(StarIcons::from_rating),
        author: record.author_name,
        rating: record.rating,
        text: record.text,
        time: record.time.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        relative_time: record.relative_time_description,
    }
}

/// Field-aware fetcher: resolves from cache when possible, otherwise asks
/// the directory for exactly the missing fields, retrying throttled calls
/// with exponential backoff.
pub struct DetailsFetcher<D> {
    directory: D,
    cache: DetailsCache,
    policy: RetryPolicy,
    abort: AbortToken,
}

impl<D> DetailsFetcher<D> {
    pub fn new(directory: D) -> Self {
        Self::with_policy(directory, RetryPolicy::default())
    }

    pub fn with_policy(directory: D, policy: RetryPolicy) -> Self {
        Self {
            directory,
            cache: DetailsCache::new(),
            policy,
            abort: AbortToken::new(),
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn cache(&self) -> &DetailsCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut DetailsCache {
        &mut self.cache
    }

    pub fn abort_token(&self) -> AbortToken {
        self.abort.clone()
    }

    /// Stop any in-flight retry waits.
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn missing_fields(&self, id: &PlaceId, requested: &[PlaceField]) -> Vec<PlaceField> {
        self.cache.missing_fields(id, requested)
    }

    pub fn merge(
        &mut self,
        id: &PlaceId,
        record: PlaceRecord,
        fields: &[PlaceField],
    ) -> &PlaceDetails {
        self.cache.merge(id, record, fields)
    }
}

impl<D: PlaceDirectory> DetailsFetcher<D> {
    /// Fetch `fields` for `id`, contacting the directory only for the
    /// fields not already cached. Returns the cached details, now holding
    /// at least the requested fields.
    pub async fn fetch(
        &mut self,
        id: &PlaceId,
        fields: &[PlaceField],
    ) -> Result<&PlaceDetails, FetchError> {
        let missing = self.cache.missing_fields(id, fields);
        if missing.is_empty() {
            debug!(place_id = %id, "all requested fields cached");
            return Ok(self.cache.ensure(id));
        }
        let record = self.request(id, &missing).await?;
        Ok(self.cache.merge(id, record, &missing))
    }

    /// Issue one directory request for `fields`, retrying while throttled.
    /// Takes a shared reference so distinct places can be fetched
    /// concurrently; requests for a single place stay sequential.
    pub async fn request(
        &self,
        id: &PlaceId,
        fields: &[PlaceField],
    ) -> Result<PlaceRecord, FetchError> {
        let request = DetailsRequest {
            place_id: id.clone(),
            fields: fields.to_vec(),
        };
        let mut retries = 0u32;
        loop {
            if self.abort.is_aborted() {
                return Err(FetchError::Aborted);
            }
            match self.directory.get_details(&request).await {
                Ok(record) => return Ok(record),
                Err(error) => match self.policy.decide(retries, &error) {
                    RetryDecision::NoRetry if error.is_throttled() => {
                        return Err(FetchError::RetriesExhausted {
                            attempts: retries + 1,
                        });
                    }
                    RetryDecision::NoRetry => return Err(error.into()),
                    RetryDecision::RetryAfter(delay) => {
                        warn!(
                            place_id = %id,
                            retry = retries,
                            delay_ms = delay.as_millis() as u64,
                            "directory throttled, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        if self.abort.is_aborted() {
                            return Err(FetchError::Aborted);
                        }
                        retries += 1;
                    }
                },
            }
        }
    }
}
