//! Surface area over synthetic elevation tiles.

use approx::assert_relative_eq;
use plotsurvey_dem::{ElevationStore, ElevationTile, TileBounds};
use plotsurvey_geom::{DrawnPolygon, Reprojector};
use plotsurvey_surface::{SurfaceConfig, SurfaceSampler};
use std::sync::Arc;

/// ~222 m square at the equator.
fn equator_square() -> DrawnPolygon {
    DrawnPolygon::from_exterior(vec![
        (0.0, 0.0),
        (0.002, 0.0),
        (0.002, 0.002),
        (0.0, 0.002),
        (0.0, 0.0),
    ])
    .unwrap()
}

fn flat_tile(bounds: TileBounds, elevation: f32) -> ElevationTile {
    ElevationTile::from_raw(bounds, 20, 20, vec![elevation; 400]).unwrap()
}

fn around_square() -> TileBounds {
    TileBounds {
        min_lat: -0.001,
        max_lat: 0.003,
        min_lon: -0.001,
        max_lon: 0.003,
    }
}

fn sampler(store: ElevationStore) -> SurfaceSampler {
    SurfaceSampler::new(
        Arc::new(store),
        Reprojector::new("utm zone=31").unwrap(),
        SurfaceConfig::default(),
    )
}

#[test]
fn test_flat_terrain_matches_flat_area() {
    let polygon = equator_square();
    let sampler = sampler(ElevationStore::from_tiles(vec![flat_tile(around_square(), 120.0)]));

    let report = sampler.compute(&polygon).unwrap();
    let flat = polygon.flat_area_sq_meters();

    assert_relative_eq!(flat, 49_300.0, max_relative = 0.01);
    assert_relative_eq!(report.terrain_area_sq_meters, flat, max_relative = 0.01);
    // 7x7 grid plus the three off-grid corners
    assert_eq!(report.sample_count, 52);
    assert!(report.triangle_count > 0);
}

#[test]
fn test_no_coverage_gives_zero() {
    let polygon = equator_square();

    let empty = sampler(ElevationStore::new());
    assert_eq!(empty.compute_surface_area(&polygon).unwrap(), 0.0);

    let elsewhere = TileBounds {
        min_lat: 10.0,
        max_lat: 11.0,
        min_lon: 10.0,
        max_lon: 11.0,
    };
    let disjoint = sampler(ElevationStore::from_tiles(vec![flat_tile(elsewhere, 50.0)]));
    let report = disjoint.compute(&polygon).unwrap();
    assert_eq!(report.terrain_area_sq_meters, 0.0);
    assert_eq!(report.sample_count, 0);
}

#[test]
fn test_half_coverage_counts_covered_half_only() {
    let polygon = equator_square();
    let west_half = TileBounds {
        min_lat: -0.001,
        max_lat: 0.003,
        min_lon: 0.0,
        max_lon: 0.001,
    };
    let sampler = sampler(ElevationStore::from_tiles(vec![flat_tile(west_half, 10.0)]));

    let area = sampler.compute_surface_area(&polygon).unwrap();
    let flat = polygon.flat_area_sq_meters();

    assert!(area > 0.0);
    // Samples reach lon 0.0009 (the tile's east edge has no cell), so a bit
    // under half the square
    let fraction = area / flat;
    assert!(fraction > 0.35 && fraction < 0.55, "fraction {fraction}");
}

#[test]
fn test_sloped_terrain_exceeds_flat_area() {
    let polygon = equator_square();
    // Elevation rising 40 m per row towards the south across the square
    let data: Vec<f32> = (0..20)
        .flat_map(|row| std::iter::repeat(row as f32 * 40.0).take(20))
        .collect();
    let tile = ElevationTile::from_raw(around_square(), 20, 20, data).unwrap();
    let sampler = sampler(ElevationStore::from_tiles(vec![tile]));

    let area = sampler.compute_surface_area(&polygon).unwrap();
    assert!(area > polygon.flat_area_sq_meters() * 1.05, "area {area}");
}

#[test]
fn test_repeated_computation_is_identical() {
    let polygon = equator_square();
    let sampler = sampler(ElevationStore::from_tiles(vec![flat_tile(around_square(), 7.0)]));

    let first = sampler.compute(&polygon).unwrap();
    let second = sampler.compute(&polygon).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_concave_polygon_excludes_notch() {
    // L-shape: the 0.002 square minus its north-east quarter
    let polygon = DrawnPolygon::from_exterior(vec![
        (0.0, 0.0),
        (0.002, 0.0),
        (0.002, 0.001),
        (0.001, 0.001),
        (0.001, 0.002),
        (0.0, 0.002),
    ])
    .unwrap();
    let sampler = sampler(ElevationStore::from_tiles(vec![flat_tile(around_square(), 0.0)]));

    let area = sampler.compute_surface_area(&polygon).unwrap();
    assert_relative_eq!(area, polygon.flat_area_sq_meters(), max_relative = 0.05);
}
