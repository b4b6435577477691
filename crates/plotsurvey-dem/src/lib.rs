//! # plotsurvey-dem
//!
//! Elevation store backed by single-band GeoTIFF DEM tiles.
//!
//! Tiles can come from:
//! - local GeoTIFF files (USGS 3DEP tiles or any georeferenced raster)
//! - arbitrary HTTP(S) URLs
//! - AWS Open Data terrain tiles, optionally cached on disk
//!
//! The store is loaded once, asynchronously, and is read-only afterwards.
//! A tile that fails to fetch or decode is logged and left out; lookups over
//! the missing area simply return no elevation.
//!
//! ## Lookup rule
//!
//! [`ElevationStore::elevation_at`] scans tiles in source order and answers
//! from the first tile whose bounds contain the point, using nearest-cell
//! sampling:
//!
//! ```text
//! row = floor((max_lat - lat) / (max_lat - min_lat) * height)
//! col = floor((lon - min_lon) / (max_lon - min_lon) * width)
//! ```
//!
//! Cells outside the raster and no-data cells yield `None`.
//!
//! ## Example
//!
//! ```no_run
//! use plotsurvey_dem::{ElevationStore, LoadOptions, TileCoord, TileSource};
//!
//! # async fn run() -> Result<(), plotsurvey_dem::DemError> {
//! let sources = vec![
//!     TileSource::path("dem_data/USGS_13_n35w119_20240327.tif"),
//!     TileSource::aws(TileCoord::from_lat_lon(34.02, -118.28, 12)?),
//! ];
//! let (store, _report) = ElevationStore::load(sources, &LoadOptions::default()).await;
//! if let Some(elevation) = store.elevation_at(34.02, -118.28) {
//!     println!("Elevation: {elevation} meters");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod source;
mod store;
mod tile;

pub use error::DemError;
pub use source::{TileCoord, TileLocation, TileSource, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};
pub use store::{ElevationStore, LoadOptions, LoadReport, TileLoadFailure};
pub use tile::{ElevationTile, TileBounds};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
