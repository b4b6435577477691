//! Static overlays: feature collections fetched once and shown as-is.

use geojson::{FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Failed to read overlay: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to fetch overlay: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Overlay server returned HTTP {0}")]
    Status(u16),

    #[error("Overlay is not valid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),

    #[error("Overlay is a bare geometry, expected a FeatureCollection")]
    NotACollection,
}

/// Where an overlay document lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlaySource {
    Path(PathBuf),
    Url(String),
}

impl fmt::Display for OverlaySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlaySource::Path(path) => write!(f, "{}", path.display()),
            OverlaySource::Url(url) => f.write_str(url),
        }
    }
}

/// Fetch and parse one overlay.
///
/// A single Feature is accepted and wrapped into a collection.
pub async fn load_overlay(
    source: &OverlaySource,
    client: &reqwest::Client,
) -> Result<FeatureCollection, OverlayError> {
    let text = match source {
        OverlaySource::Path(path) => tokio::fs::read_to_string(path).await?,
        OverlaySource::Url(url) => {
            let response = client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(OverlayError::Status(response.status().as_u16()));
            }
            response.text().await?
        }
    };
    parse_overlay(&text)
}

pub fn parse_overlay(text: &str) -> Result<FeatureCollection, OverlayError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(OverlayError::NotACollection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"voltage": 230},
         "geometry": {"type": "LineString", "coordinates": [[-118.3, 34.0], [-118.2, 34.1]]}},
        {"type": "Feature", "properties": {"voltage": 66},
         "geometry": {"type": "LineString", "coordinates": [[-118.4, 34.0], [-118.3, 34.2]]}}
      ]
    }"#;

    #[test]
    fn test_parse_collection() {
        let collection = parse_overlay(LINES).unwrap();
        assert_eq!(collection.features.len(), 2);
    }

    #[test]
    fn test_single_feature_is_wrapped() {
        let text = r#"{"type": "Feature", "properties": {"name": "Station 27"},
                       "geometry": {"type": "Point", "coordinates": [-118.33, 34.10]}}"#;
        assert_eq!(parse_overlay(text).unwrap().features.len(), 1);
    }

    #[test]
    fn test_bare_geometry_rejected() {
        let text = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(parse_overlay(text), Err(OverlayError::NotACollection)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let client = reqwest::Client::new();
        let source = OverlaySource::Path(PathBuf::from("/nonexistent/overlay.geojson"));
        assert!(matches!(
            load_overlay(&source, &client).await,
            Err(OverlayError::Io(_))
        ));
    }
}
