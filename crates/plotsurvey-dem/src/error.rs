//! Error types for the DEM crate.

use thiserror::Error;

/// Errors that can occur when loading or decoding elevation tiles.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing georeferencing and no usable fallback.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Invalid tile filename - cannot parse coordinates.
    #[error("Invalid tile filename: {0}")]
    InvalidFilename(String),

    /// Raster payload does not match the declared dimensions.
    #[error("Raster has {actual} samples, expected {width}x{height}")]
    RasterSizeMismatch {
        /// Declared width in pixels.
        width: u32,
        /// Declared height in pixels.
        height: u32,
        /// Number of samples actually present.
        actual: usize,
    },

    /// Tile bounds are empty or inverted.
    #[error("Invalid tile bounds: lat {min_lat}..{max_lat}, lon {min_lon}..{max_lon}")]
    InvalidBounds {
        /// South edge.
        min_lat: f64,
        /// North edge.
        max_lat: f64,
        /// West edge.
        min_lon: f64,
        /// East edge.
        max_lon: f64,
    },

    /// HTTP request error when fetching tiles.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Remote server answered with a non-success status.
    #[error("Failed to download tile {source_label}: {reason}")]
    TileDownloadFailed {
        /// Human-readable tile source.
        source_label: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid zoom level.
    #[error("Invalid zoom level {0} (must be 1-14)")]
    InvalidZoomLevel(u8),

    /// A background load task panicked or was cancelled.
    #[error("Tile load task failed: {0}")]
    TaskFailed(String),
}
