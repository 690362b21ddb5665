//! HTTP places directory client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{
    DetailsRequest, DirectoryError, FindRequest, PlaceDirectory, PlaceRecord, ReviewRecord,
};
use crate::models::{GeoPoint, Photo, PlaceField, PlaceId};

/// Pixel bound for result-card thumbnails.
const PHOTO_SMALL_MAX: u32 = 200;
/// Pixel bound for the photo modal.
const PHOTO_LARGE_MAX: u32 = 1200;

/// Places directory backed by a JSON HTTP API.
pub struct HttpDirectory {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsEnvelope {
    status: String,
    #[serde(default)]
    result: Option<RawPlace>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindEnvelope {
    status: String,
    #[serde(default)]
    candidates: Vec<RawPlace>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    place_id: Option<String>,
    name: Option<String>,
    types: Option<Vec<String>>,
    geometry: Option<RawGeometry>,
    formatted_address: Option<String>,
    photos: Option<Vec<RawPhoto>>,
    url: Option<String>,
    website: Option<String>,
    formatted_phone_number: Option<String>,
    opening_hours: Option<RawOpeningHours>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
    price_level: Option<u8>,
    reviews: Option<Vec<RawReview>>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    location: RawLocation,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct RawOpeningHours {
    #[serde(default)]
    weekday_text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    photo_reference: String,
    #[serde(default)]
    html_attributions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    author_name: String,
    rating: Option<f64>,
    text: Option<String>,
    time: Option<i64>,
    relative_time_description: Option<String>,
}

impl HttpDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("neighborly/0.1")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn photo_url(&self, reference: &str, max: u32) -> String {
        format!(
            "{}/photo?photo_reference={}&maxwidth={}&maxheight={}",
            self.base_url, reference, max, max
        )
    }

    /// Lower a wire place into the boundary record, resolving photo
    /// references into sized URLs.
    fn convert(&self, raw: RawPlace) -> PlaceRecord {
        PlaceRecord {
            place_id: raw.place_id.map(PlaceId::new),
            name: raw.name,
            types: raw.types,
            location: raw
                .geometry
                .map(|g| GeoPoint::new(g.location.lat, g.location.lng)),
            formatted_address: raw.formatted_address,
            photos: raw.photos.map(|photos| {
                photos
                    .into_iter()
                    .map(|p| Photo {
                        url_small: self.photo_url(&p.photo_reference, PHOTO_SMALL_MAX),
                        url_large: self.photo_url(&p.photo_reference, PHOTO_LARGE_MAX),
                        attributions: p.html_attributions,
                    })
                    .collect()
            }),
            url: raw.url,
            website: raw.website,
            formatted_phone_number: raw.formatted_phone_number,
            weekday_text: raw.opening_hours.map(|h| h.weekday_text),
            rating: raw.rating,
            user_ratings_total: raw.user_ratings_total,
            price_level: raw.price_level,
            reviews: raw.reviews.map(|reviews| {
                reviews
                    .into_iter()
                    .map(|r| ReviewRecord {
                        author_name: r.author_name,
                        rating: r.rating,
                        text: r.text,
                        time: r.time,
                        relative_time_description: r.relative_time_description,
                    })
                    .collect()
            }),
        }
    }
}

/// Map a non-OK envelope status to a typed error.
fn status_error(status: &str, message: Option<String>) -> DirectoryError {
    let detail = message.unwrap_or_else(|| status.to_string());
    match status {
        "OVER_QUERY_LIMIT" => DirectoryError::OverQueryLimit,
        "NOT_FOUND" | "ZERO_RESULTS" => DirectoryError::NotFound(detail),
        "INVALID_REQUEST" => DirectoryError::InvalidRequest(detail),
        "REQUEST_DENIED" => DirectoryError::Denied(detail),
        other => DirectoryError::Status(other.to_string()),
    }
}

#[async_trait]
impl PlaceDirectory for HttpDirectory {
    async fn get_details(&self, request: &DetailsRequest) -> Result<PlaceRecord, DirectoryError> {
        let fields = request
            .fields
            .iter()
            .map(PlaceField::as_str)
            .collect::<Vec<_>>()
            .join(",");
        debug!(place_id = %request.place_id, %fields, "requesting place details");

        let mut req = self
            .client
            .get(format!("{}/details", self.base_url))
            .query(&[
                ("place_id", request.place_id.as_str()),
                ("fields", fields.as_str()),
            ]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }

        let response = req.send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(DirectoryError::OverQueryLimit);
        }
        let envelope: DetailsEnvelope = response.error_for_status()?.json().await?;
        if envelope.status != "OK" {
            return Err(status_error(&envelope.status, envelope.error_message));
        }
        let raw = envelope
            .result
            .ok_or_else(|| DirectoryError::Status("OK status with empty result".to_string()))?;
        Ok(self.convert(raw))
    }

    async fn find_place(&self, request: &FindRequest) -> Result<PlaceRecord, DirectoryError> {
        let bounds = format!(
            "{},{},{},{}",
            request.bounds.min_lat,
            request.bounds.min_lon,
            request.bounds.max_lat,
            request.bounds.max_lon
        );
        debug!(query = %request.query, %bounds, "finding place");

        let mut req = self
            .client
            .get(format!("{}/find", self.base_url))
            .query(&[("query", request.query.as_str()), ("bounds", bounds.as_str())]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }

        let response = req.send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(DirectoryError::OverQueryLimit);
        }
        let envelope: FindEnvelope = response.error_for_status()?.json().await?;
        if envelope.status != "OK" {
            return Err(status_error(&envelope.status, envelope.error_message));
        }
        let raw = envelope
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::NotFound(request.query.clone()))?;
        Ok(self.convert(raw))
    }
}
