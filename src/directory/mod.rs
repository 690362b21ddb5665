//! Boundary to the external places directory service.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{GeoBounds, Photo, PlaceField, PlaceId};

pub mod http;

pub use http::HttpDirectory;

/// Request for a subset of a place's attribute fields.
#[derive(Debug, Clone)]
pub struct DetailsRequest {
    pub place_id: PlaceId,
    /// Exactly the fields to fetch; the caller has already removed cached ones.
    pub fields: Vec<PlaceField>,
}

/// Text search for a single place, biased to a viewport.
#[derive(Debug, Clone)]
pub struct FindRequest {
    pub query: String,
    pub bounds: GeoBounds,
}

/// Raw attributes returned by the directory for one place.
///
/// Only the requested fields are populated; everything else stays `None`.
#[derive(Debug, Clone, Default)]
pub struct PlaceRecord {
    pub place_id: Option<PlaceId>,
    pub name: Option<String>,
    pub types: Option<Vec<String>>,
    pub location: Option<crate::models::GeoPoint>,
    pub formatted_address: Option<String>,
    pub photos: Option<Vec<Photo>>,
    pub url: Option<String>,
    pub website: Option<String>,
    pub formatted_phone_number: Option<String>,
    /// Per-weekday hours text, one entry per day.
    pub weekday_text: Option<Vec<String>>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
    pub price_level: Option<u8>,
    pub reviews: Option<Vec<ReviewRecord>>,
}

/// A single review as returned by the directory.
#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub author_name: String,
    pub rating: Option<f64>,
    pub text: Option<String>,
    /// Unix timestamp in seconds.
    pub time: Option<i64>,
    pub relative_time_description: Option<String>,
}

/// Errors surfaced by a directory implementation.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The service asked us to slow down; the only retryable error.
    #[error("query rate limit exceeded")]
    OverQueryLimit,
    #[error("place not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request denied: {0}")]
    Denied(String),
    #[error("unexpected directory status: {0}")]
    Status(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DirectoryError {
    /// Whether this error is the throttling signal worth backing off for.
    pub fn is_throttled(&self) -> bool {
        matches!(self, DirectoryError::OverQueryLimit)
    }
}

/// Abstraction over the external places directory.
///
/// Implementations cover a concrete backend (the bundled HTTP client, or an
/// in-memory double in tests) and fetch exactly what each request names.
#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    /// Fetch the requested fields for one place.
    async fn get_details(&self, request: &DetailsRequest) -> Result<PlaceRecord, DirectoryError>;

    /// Find a single place matching a text query within the given bounds.
    async fn find_place(&self, request: &FindRequest) -> Result<PlaceRecord, DirectoryError>;
}
