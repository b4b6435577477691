//! Sample locations: a regular lon/lat grid masked by the polygon.

use crate::{Result, SurfaceError};
use plotsurvey_geom::DrawnPolygon;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default grid step in degrees (about 30 m of latitude).
pub const DEFAULT_GRID_SPACING_DEG: f64 = 0.0003;

/// Default cap on grid nodes generated over a polygon's bounding box.
pub const DEFAULT_MAX_GRID_POINTS: u64 = 50_000;

/// Quantization for duplicate detection, in degrees.
const DEDUP_QUANTUM: f64 = 1e-9;

/// Sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Grid step in degrees, applied on both axes.
    pub grid_spacing_deg: f64,
    /// Add the polygon's ring vertices to the sample set.
    pub include_ring_vertices: bool,
    /// Refuse polygons whose bounding-box grid would exceed this many nodes.
    pub max_grid_points: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            grid_spacing_deg: DEFAULT_GRID_SPACING_DEG,
            include_ring_vertices: true,
            max_grid_points: DEFAULT_MAX_GRID_POINTS,
        }
    }
}

impl SurfaceConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.grid_spacing_deg.is_finite() || self.grid_spacing_deg <= 0.0 {
            return Err(SurfaceError::InvalidConfig(format!(
                "grid_spacing_deg must be positive, got {}",
                self.grid_spacing_deg
            )));
        }
        if self.max_grid_points == 0 {
            return Err(SurfaceError::InvalidConfig(
                "max_grid_points must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Grid nodes along one axis, both ends inclusive.
fn axis_count(span: f64, spacing: f64) -> u64 {
    // Tolerance keeps an end that lands exactly on a grid line
    (span / spacing + 1e-9).floor() as u64 + 1
}

/// `(lon, lat)` locations to sample for `polygon`.
///
/// Grid nodes start at the bounding box's south-west corner; only nodes inside
/// the polygon (boundary inclusive) are kept. Ring vertices are appended when
/// configured. Duplicates are removed, keeping first occurrence order.
pub fn sample_locations(polygon: &DrawnPolygon, config: &SurfaceConfig) -> Result<Vec<(f64, f64)>> {
    config.validate()?;

    let bbox = polygon.bbox();
    let spacing = config.grid_spacing_deg;
    let cols = axis_count(bbox.width_deg(), spacing);
    let rows = axis_count(bbox.height_deg(), spacing);

    let total = cols.saturating_mul(rows);
    if total > config.max_grid_points {
        return Err(SurfaceError::GridTooLarge {
            points: total,
            limit: config.max_grid_points,
        });
    }

    let mut seen = HashSet::new();
    let mut locations = Vec::new();
    let mut push = |lon: f64, lat: f64| {
        let key = (
            (lon / DEDUP_QUANTUM).round() as i64,
            (lat / DEDUP_QUANTUM).round() as i64,
        );
        if seen.insert(key) {
            locations.push((lon, lat));
        }
    };

    for row in 0..rows {
        let lat = bbox.min_lat + row as f64 * spacing;
        for col in 0..cols {
            let lon = bbox.min_lon + col as f64 * spacing;
            if polygon.contains_point(lon, lat) {
                push(lon, lat);
            }
        }
    }

    if config.include_ring_vertices {
        for (lon, lat) in polygon.ring_vertices() {
            push(lon, lat);
        }
    }

    Ok(locations)
}
