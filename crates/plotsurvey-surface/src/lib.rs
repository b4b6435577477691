//! # plotsurvey-surface
//!
//! Terrain-aware surface area of a drawn polygon.
//!
//! 1. Sample a regular lon/lat grid over the polygon's bounding box, keeping
//!    nodes inside the polygon, plus the polygon's own vertices.
//! 2. Look up each sample's elevation; drop samples without one.
//! 3. Project to planar meters and triangulate on `(x, y)` only.
//! 4. Drop triangles whose centroid is outside the polygon, then sum
//!    `0.5 * |AB x AC|` over the remaining triangles in `(x, y, z)`.
//!
//! Fewer than three samples with elevation gives an area of zero rather than
//! an error. The result approximates the true terrain area: it undercounts
//! curvature finer than the grid step.

mod error;
mod grid;
mod mesh;
mod sampler;

pub use error::SurfaceError;
pub use grid::{sample_locations, SurfaceConfig, DEFAULT_GRID_SPACING_DEG, DEFAULT_MAX_GRID_POINTS};
pub use mesh::{triangle_area_3d, SamplePoint3D, SurfaceMesh, Triangle};
pub use sampler::{SurfaceReport, SurfaceSampler};

/// Result type for surface computations.
pub type Result<T> = std::result::Result<T, SurfaceError>;
