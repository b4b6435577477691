//! Terrain-aware surface area of a drawn polygon.

use crate::grid::{sample_locations, SurfaceConfig};
use crate::mesh::{SamplePoint3D, SurfaceMesh, Triangle};
use crate::Result;
use plotsurvey_dem::ElevationStore;
use plotsurvey_geom::{triangulate, DrawnPolygon, Reprojector};
use plotsurvey_metrics::metric_defs;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of one surface computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceReport {
    /// Sum of 3D triangle areas, square meters. Zero when fewer than three
    /// samples have elevation.
    pub terrain_area_sq_meters: f64,
    /// Samples with a defined elevation.
    pub sample_count: usize,
    /// Triangles summed into the area.
    pub triangle_count: usize,
}

impl SurfaceReport {
    pub fn terrain_area_sq_km(&self) -> f64 {
        self.terrain_area_sq_meters / 1e6
    }
}

/// Samples elevation over a polygon and integrates the triangulated surface.
///
/// Cloning is cheap: the elevation store is shared.
#[derive(Debug, Clone)]
pub struct SurfaceSampler {
    store: Arc<ElevationStore>,
    reprojector: Reprojector,
    config: SurfaceConfig,
}

impl SurfaceSampler {
    pub fn new(store: Arc<ElevationStore>, reprojector: Reprojector, config: SurfaceConfig) -> Self {
        Self {
            store,
            reprojector,
            config,
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ElevationStore> {
        &self.store
    }

    /// Surface area in square meters; see [`SurfaceSampler::compute`].
    pub fn compute_surface_area(&self, polygon: &DrawnPolygon) -> Result<f64> {
        Ok(self.compute(polygon)?.terrain_area_sq_meters)
    }

    /// Build the mesh and sum its 3D area.
    pub fn compute(&self, polygon: &DrawnPolygon) -> Result<SurfaceReport> {
        let mesh = self.build_mesh(polygon)?;
        let report = SurfaceReport {
            terrain_area_sq_meters: mesh.area(),
            sample_count: mesh.points.len(),
            triangle_count: mesh.triangles.len(),
        };

        metrics::histogram!(metric_defs::SURFACE_SAMPLES.name).record(report.sample_count as f64);
        metrics::histogram!(metric_defs::SURFACE_TRIANGLES.name).record(report.triangle_count as f64);
        debug!(
            samples = report.sample_count,
            triangles = report.triangle_count,
            area_sq_m = report.terrain_area_sq_meters,
            "Surface computed"
        );
        Ok(report)
    }

    /// Sample, project and triangulate.
    ///
    /// Samples without elevation are dropped. With fewer than three samples
    /// left the mesh has no triangles. Triangles whose centroid falls outside
    /// the polygon are removed, so concave shapes do not pick up hull area.
    pub fn build_mesh(&self, polygon: &DrawnPolygon) -> Result<SurfaceMesh> {
        let locations = sample_locations(polygon, &self.config)?;
        let candidates = locations.len();

        let mut geographic = Vec::with_capacity(candidates);
        let mut elevations = Vec::with_capacity(candidates);
        for (lon, lat) in locations {
            match self.store.elevation_at(lat, lon) {
                Some(z) if z.is_finite() => {
                    geographic.push((lon, lat));
                    elevations.push(f64::from(z));
                }
                _ => trace!(lon, lat, "No elevation at sample"),
            }
        }

        let planar = self.reprojector.to_planar_all(&geographic)?;
        let points: Vec<SamplePoint3D> = planar
            .iter()
            .zip(&elevations)
            .map(|(&(x, y), &z)| SamplePoint3D { x, y, z })
            .collect();

        if points.len() < 3 {
            debug!(
                candidates,
                valid = points.len(),
                "Insufficient elevation coverage; surface area is zero"
            );
            return Ok(SurfaceMesh {
                points,
                triangles: Vec::new(),
            });
        }

        let raw = triangulate(&planar);
        let raw_count = raw.len();
        let triangles: Vec<Triangle> = raw
            .into_iter()
            .filter(|t| {
                let (lon, lat) = t.iter().fold((0.0, 0.0), |(sx, sy), &i| {
                    (sx + geographic[i].0, sy + geographic[i].1)
                });
                polygon.contains_point(lon / 3.0, lat / 3.0)
            })
            .map(Triangle)
            .collect();

        debug!(
            candidates,
            valid = points.len(),
            triangles = triangles.len(),
            culled = raw_count - triangles.len(),
            "Surface mesh built"
        );

        Ok(SurfaceMesh { points, triangles })
    }
}
