//! Error types for the geometry crate.

use thiserror::Error;

/// Errors raised while building polygons or projecting coordinates.
#[derive(Error, Debug)]
pub enum GeomError {
    #[error("GeoJSON parse error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Expected a Polygon geometry, found {0}")]
    UnsupportedGeometry(&'static str),

    #[error("Feature has no geometry")]
    MissingGeometry,

    #[error("FeatureCollection contains no features")]
    EmptyCollection,

    #[error("Polygon ring has {0} distinct vertices, at least 3 are required")]
    DegenerateRing(usize),

    #[error("Invalid coordinate at position {index}: {reason}")]
    InvalidCoordinate { index: usize, reason: String },

    #[error("Invalid projection definition '{definition}': {reason}")]
    InvalidProjection { definition: String, reason: String },

    #[error("Projection of ({lon}, {lat}) failed: {reason}")]
    ProjectionFailed { lon: f64, lat: f64, reason: String },
}
