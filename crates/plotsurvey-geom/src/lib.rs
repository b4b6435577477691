//! # plotsurvey-geom
//!
//! Geometry shared by the analysis pipeline:
//!
//! - [`DrawnPolygon`]: the drawn polygon, parsed from GeoJSON, with its
//!   cached [`BoundingBox`] and geodesic flat area
//! - [`Reprojector`]: fixed geographic-to-planar projection (`geodesy`)
//! - [`triangulate`]: Bowyer-Watson Delaunay triangulation of planar points
//!
//! Coordinates are `(lon, lat)` in degrees unless a function says otherwise.

mod bbox;
mod delaunay;
mod error;
mod polygon;
mod projection;

pub use bbox::BoundingBox;
pub use delaunay::triangulate;
pub use error::GeomError;
pub use polygon::DrawnPolygon;
pub use projection::Reprojector;

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeomError>;
