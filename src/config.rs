//! Widget configuration loaded from TOML.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::models::{GeoPoint, Neighborhood};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub map: MapConfig,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub pois: Vec<PoiConfig>,
    #[serde(default)]
    pub neighborhoods: Vec<Neighborhood>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    pub center: GeoPoint,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    /// Zoom level at which the map's own POI pins become visible.
    #[serde(default = "default_poi_min_zoom")]
    pub poi_min_zoom: u8,
    /// Radius in meters used to bias place searches around the center.
    #[serde(default = "default_search_radius")]
    pub search_radius_m: f64,
}

/// Feature flags scoping which attribute groups the widget requests.
#[derive(Debug, Deserialize, Clone)]
pub struct Capabilities {
    #[serde(default = "default_true")]
    pub search: bool,
    #[serde(default)]
    pub distances: bool,
    #[serde(default)]
    pub directions: bool,
    /// Website and phone number fields.
    #[serde(default = "default_true")]
    pub contacts: bool,
    /// Rating, review, and price level fields.
    #[serde(default = "default_true")]
    pub atmospheres: bool,
    /// Photo fields.
    #[serde(default = "default_true")]
    pub thumbnails: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            search: true,
            distances: false,
            directions: false,
            contacts: true,
            atmospheres: true,
            thumbnails: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    /// Number of POIs shown on widget load.
    #[serde(default = "default_initial_count")]
    pub initial_count: usize,
    /// Number of additional POIs shown per "show more".
    #[serde(default = "default_show_more_count")]
    pub show_more_count: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            initial_count: default_initial_count(),
            show_more_count: default_show_more_count(),
        }
    }
}

/// One seed POI from the host page.
#[derive(Debug, Deserialize, Clone)]
pub struct PoiConfig {
    pub place_id: String,
}

fn default_zoom() -> u8 {
    12
}

fn default_min_zoom() -> u8 {
    3
}

fn default_max_zoom() -> u8 {
    20
}

fn default_poi_min_zoom() -> u8 {
    18
}

fn default_search_radius() -> f64 {
    1000.0
}

fn default_true() -> bool {
    true
}

fn default_initial_count() -> usize {
    5
}

fn default_show_more_count() -> usize {
    5
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EXAMPLE: &str = r#"
[map]
center = { lat = 39.9526, lon = -75.1652 }
zoom = 12

[capabilities]
search = true
distances = false

[pagination]
initial_count = 5
show_more_count = 5

[[pois]]
place_id = "poi-market"

[[pois]]
place_id = "poi-museum"

[[neighborhoods]]
name = "Rittenhouse Square"
center = { lat = 39.9496, lon = -75.1713 }
radius_m = 400.0
"#;

    #[test]
    fn test_parse_example() {
        let config: Config = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.pois.len(), 2);
        assert_eq!(config.neighborhoods.len(), 1);
        assert_eq!(config.map.poi_min_zoom, 18);
        assert!((config.map.search_radius_m - 1000.0).abs() < f64::EPSILON);
        assert!(config.capabilities.contacts);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config =
            toml::from_str("[map]\ncenter = { lat = 1.0, lon = 2.0 }\n").unwrap();
        assert_eq!(config.pagination.initial_count, 5);
        assert_eq!(config.pagination.show_more_count, 5);
        assert!(config.pois.is_empty());
        assert!(config.capabilities.search);
        assert!(!config.capabilities.directions);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.pois[0].place_id, "poi-market");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load_from_file("/nonexistent/widget.toml").is_err());
    }
}
