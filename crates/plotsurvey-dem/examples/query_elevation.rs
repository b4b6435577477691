//! Example: Query elevation from GeoTIFF tiles.
//!
//! Usage: cargo run --example query_elevation -- <lat> <lon> <tile.tif>...

use plotsurvey_dem::{ElevationStore, LoadOptions, TileSource};
use std::env;
use std::time::Instant;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <lat> <lon> <tile.tif>...", args[0]);
        eprintln!("Example: {} 34.0224 -118.2851 ./dem_data/USGS_13_n35w119.tif", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let sources: Vec<TileSource> = args[3..].iter().map(TileSource::path).collect();

    println!("Loading {} tile(s)...", sources.len());
    let start = Instant::now();
    let (store, report) = ElevationStore::load(sources, &LoadOptions::default()).await;
    println!(
        "Loaded {} tile(s) in {:.3}s",
        report.loaded.len(),
        start.elapsed().as_secs_f64()
    );
    for failure in &report.failed {
        eprintln!("  skipped {}: {}", failure.source, failure.error);
    }

    if let Some(bounds) = store.coverage() {
        println!(
            "Coverage: lat {:.4}° to {:.4}°, lon {:.4}° to {:.4}°",
            bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon
        );
    }

    match store.elevation_at(lat, lon) {
        Some(elevation) => println!("Elevation at ({}, {}): {:.2} meters", lat, lon, elevation),
        None => {
            eprintln!("No elevation data at ({}, {})", lat, lon);
            std::process::exit(1);
        }
    }
}
