//! Combining building and area results into one record.

use plotsurvey_buildings::{BuildingFeature, BuildingSet};
use plotsurvey_surface::SurfaceReport;
use serde::Serialize;

/// Everything reported for one drawn polygon.
///
/// `terrain_area_sq_meters` is usually at least the flat area but this is not
/// enforced; it is zero when elevation does not cover the polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub building_count: usize,
    pub flat_area_sq_meters: f64,
    pub terrain_area_sq_meters: f64,
    pub filtered_buildings: Vec<BuildingFeature>,
    /// Features the query returned before the intersection filter.
    pub buildings_returned: usize,
    pub sample_count: usize,
    pub triangle_count: usize,
}

/// Pure combination of the sub-results; no I/O.
pub fn aggregate(buildings: BuildingSet, flat_area_sq_meters: f64, surface: SurfaceReport) -> AnalysisResult {
    AnalysisResult {
        building_count: buildings.count(),
        flat_area_sq_meters,
        terrain_area_sq_meters: surface.terrain_area_sq_meters,
        buildings_returned: buildings.returned,
        filtered_buildings: buildings.features,
        sample_count: surface.sample_count,
        triangle_count: surface.triangle_count,
    }
}

impl AnalysisResult {
    /// Text for the dashboard.
    pub fn summary(&self) -> String {
        format!(
            "Total buildings in drawn area: {}\nFlat area: {:.4} km² ({:.0} m²)\nTerrain area: {:.4} km² ({:.0} m²)",
            self.building_count,
            self.flat_area_sq_meters / 1e6,
            self.flat_area_sq_meters,
            self.terrain_area_sq_meters / 1e6,
            self.terrain_area_sq_meters,
        )
    }

    /// Filtered buildings for rendering.
    pub fn feature_collection(&self) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: self.filtered_buildings.iter().map(BuildingFeature::to_geojson).collect(),
            foreign_members: None,
        }
    }

    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            building_count: self.building_count,
            buildings_returned: self.buildings_returned,
            flat_area_sq_meters: self.flat_area_sq_meters,
            terrain_area_sq_meters: self.terrain_area_sq_meters,
            flat_area_sq_km: self.flat_area_sq_meters / 1e6,
            terrain_area_sq_km: self.terrain_area_sq_meters / 1e6,
            sample_count: self.sample_count,
            triangle_count: self.triangle_count,
            buildings: self.feature_collection(),
        }
    }
}

/// Serializable form of an [`AnalysisResult`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub building_count: usize,
    pub buildings_returned: usize,
    pub flat_area_sq_meters: f64,
    pub terrain_area_sq_meters: f64,
    pub flat_area_sq_km: f64,
    pub terrain_area_sq_km: f64,
    pub sample_count: usize,
    pub triangle_count: usize,
    pub buildings: geojson::FeatureCollection,
}
