//! Where elevation tiles come from.
//!
//! A [`TileSource`] names one raster: a local GeoTIFF, an arbitrary HTTP URL,
//! or a tile of the AWS Open Data terrain set
//! (`https://s3.amazonaws.com/elevation-tiles-prod/geotiff/{z}/{x}/{y}.tif`).
//!
//! ## AWS Tile Coordinate System
//!
//! AWS terrain tiles use the OpenStreetMap Slippy Map naming convention:
//! - `z` is the zoom level (1-14, default 12)
//! - `x` is the column (0 to 2^z - 1, from west to east)
//! - `y` is the row (0 to 2^z - 1, from north to south)
//!
//! At zoom level 12 each tile covers ~0.088° (about 9.8 km at the equator)
//! at roughly 38 m per pixel.

use crate::tile::TileBounds;
use crate::{DemError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// AWS S3 base URL for elevation tiles.
const AWS_TILE_BASE_URL: &str = "https://s3.amazonaws.com/elevation-tiles-prod/geotiff";

/// Minimum valid zoom level.
pub const MIN_ZOOM: u8 = 1;

/// Maximum valid zoom level for AWS elevation tiles.
pub const MAX_ZOOM: u8 = 14;

/// Default zoom level (good balance of detail and tile count).
pub const DEFAULT_ZOOM: u8 = 12;

/// OSM-style tile coordinates (z, x, y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level (1-14).
    pub z: u8,
    /// X coordinate (column, 0 at 180°W, increases eastward).
    pub x: u32,
    /// Y coordinate (row, 0 at ~85.05°N, increases southward).
    pub y: u32,
}

impl TileCoord {
    /// Convert latitude/longitude to tile coordinates.
    ///
    /// Uses the OpenStreetMap Slippy Map tiling formula:
    /// - x = floor((lon + 180) / 360 * 2^z)
    /// - y = floor((1 - ln(tan(lat) + sec(lat)) / π) / 2 * 2^z)
    pub fn from_lat_lon(lat: f64, lon: f64, z: u8) -> Result<Self> {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&z) {
            return Err(DemError::InvalidZoomLevel(z));
        }

        // Web Mercator is undefined past ±85.0511287798° (arctan(sinh(π)))
        let lat_clamped = lat.clamp(-85.0511, 85.0511);
        let n = (1u32 << z) as f64;

        let x = ((lon + 180.0) / 360.0 * n).floor().max(0.0) as u32;
        let lat_rad = lat_clamped.to_radians();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n)
            .floor()
            .max(0.0) as u32;

        // Clamp to valid range (handles edge cases at exactly ±180°)
        let max_coord = (1u32 << z) - 1;
        Ok(Self {
            z,
            x: x.min(max_coord),
            y: y.min(max_coord),
        })
    }

    /// Geographic footprint of this tile.
    pub fn bounds(&self) -> TileBounds {
        let n = (1u32 << self.z) as f64;

        let min_lon = self.x as f64 / n * 360.0 - 180.0;
        let max_lon = (self.x + 1) as f64 / n * 360.0 - 180.0;

        // Inverse of the Slippy Map formula
        let max_lat = (PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan().to_degrees();
        let min_lat = (PI * (1.0 - 2.0 * (self.y + 1) as f64 / n)).sinh().atan().to_degrees();

        TileBounds {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Get the cache file path for this tile.
    pub fn cache_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir
            .join(self.z.to_string())
            .join(self.x.to_string())
            .join(format!("{}.tif", self.y))
    }

    /// Get the AWS S3 URL for this tile.
    pub fn aws_url(&self) -> String {
        format!("{}/{}/{}/{}.tif", AWS_TILE_BASE_URL, self.z, self.x, self.y)
    }
}

/// Location of one raster tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileLocation {
    /// GeoTIFF on the local filesystem.
    Path(PathBuf),
    /// GeoTIFF served over HTTP(S).
    Url(String),
    /// AWS Open Data terrain tile.
    Aws(TileCoord),
}

/// A configured tile: its location plus optional explicit bounds.
///
/// Explicit bounds override whatever georeferencing the file carries; they
/// are needed for plain TIFFs without GeoTIFF tags or a USGS-style name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSource {
    /// Where to read the raster from.
    #[serde(flatten)]
    pub location: TileLocation,
    /// Geographic bounds overriding the file's own georeferencing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<TileBounds>,
}

impl TileSource {
    /// A local GeoTIFF.
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            location: TileLocation::Path(path.into()),
            bounds: None,
        }
    }

    /// A GeoTIFF behind an HTTP(S) URL.
    pub fn url<S: Into<String>>(url: S) -> Self {
        Self {
            location: TileLocation::Url(url.into()),
            bounds: None,
        }
    }

    /// An AWS terrain tile.
    pub fn aws(coord: TileCoord) -> Self {
        Self {
            location: TileLocation::Aws(coord),
            bounds: None,
        }
    }

    /// Override the tile's georeferencing.
    pub fn with_bounds(mut self, bounds: TileBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// All AWS terrain tiles at `zoom` touching the given bounds, north-west first.
    pub fn aws_covering(bounds: &TileBounds, zoom: u8) -> Result<Vec<TileSource>> {
        let top_left = TileCoord::from_lat_lon(bounds.max_lat, bounds.min_lon, zoom)?;
        let bottom_right = TileCoord::from_lat_lon(bounds.min_lat, bounds.max_lon, zoom)?;

        let mut sources = Vec::new();
        for y in top_left.y..=bottom_right.y {
            for x in top_left.x..=bottom_right.x {
                sources.push(TileSource::aws(TileCoord { z: zoom, x, y }));
            }
        }
        Ok(sources)
    }

    /// Bounds known without reading the raster, if any.
    pub fn known_bounds(&self) -> Option<TileBounds> {
        match (&self.bounds, &self.location) {
            (Some(bounds), _) => Some(*bounds),
            (None, TileLocation::Aws(coord)) => Some(coord.bounds()),
            (None, _) => None,
        }
    }

    /// File name used to infer USGS-style bounds when the TIFF has no tags.
    pub fn name_hint(&self) -> Option<&str> {
        match &self.location {
            TileLocation::Path(path) => path.file_name().and_then(|s| s.to_str()),
            TileLocation::Url(url) => url.rsplit('/').next().filter(|s| !s.is_empty()),
            TileLocation::Aws(_) => None,
        }
    }

    /// Fetch the raw GeoTIFF bytes.
    ///
    /// AWS tiles are read from and written to `cache_dir` when one is given.
    pub async fn fetch_bytes(
        &self,
        client: &reqwest::Client,
        cache_dir: Option<&Path>,
    ) -> Result<Vec<u8>> {
        match &self.location {
            TileLocation::Path(path) => Ok(tokio::fs::read(path).await?),
            TileLocation::Url(url) => self.download(client, url).await,
            TileLocation::Aws(coord) => {
                let Some(cache_dir) = cache_dir else {
                    return self.download(client, &coord.aws_url()).await;
                };

                let cache_path = coord.cache_path(cache_dir);
                if tokio::fs::try_exists(&cache_path).await.unwrap_or(false) {
                    debug!(tile = %self, path = %cache_path.display(), "Using cached tile");
                    return Ok(tokio::fs::read(&cache_path).await?);
                }

                let bytes = self.download(client, &coord.aws_url()).await?;
                if let Err(e) = write_cache_file(&cache_path, &bytes).await {
                    warn!(tile = %self, path = %cache_path.display(), error = %e, "Could not cache tile");
                }
                Ok(bytes)
            }
        }
    }

    async fn download(&self, client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DemError::TileDownloadFailed {
                source_label: self.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await?;
        debug!(tile = %self, bytes = bytes.len(), "Downloaded tile");
        Ok(bytes.to_vec())
    }
}

impl fmt::Display for TileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            TileLocation::Path(path) => write!(f, "{}", path.display()),
            TileLocation::Url(url) => f.write_str(url),
            TileLocation::Aws(coord) => write!(f, "aws:{}/{}/{}", coord.z, coord.x, coord.y),
        }
    }
}

/// Write `bytes` to a sibling `.part` file, then rename it over `path`.
///
/// A partial write never appears under the final name.
async fn write_cache_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    tokio::fs::rename(&partial, path).await
}
