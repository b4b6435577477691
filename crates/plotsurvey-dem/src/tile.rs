//! Single elevation tile representation.

use crate::{DemError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

/// GeoTIFF ModelTiepointTag.
const TAG_MODEL_TIEPOINT: u16 = 33922;
/// GeoTIFF ModelPixelScaleTag.
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
/// GDAL_NODATA, stored as an ASCII string.
const TAG_GDAL_NODATA: u16 = 42113;

/// No-data value assumed for USGS DEMs when the GDAL tag is absent.
const USGS_DEFAULT_NO_DATA: f32 = -999_999.0;

/// A single-band elevation raster with its geographic footprint.
///
/// Samples are stored row-major, north to south then west to east. Lookups
/// use nearest-cell sampling only: no value is ever interpolated between
/// cells or extrapolated past the raster.
#[derive(Debug)]
pub struct ElevationTile {
    /// Elevation data in row-major order (north to south, west to east).
    data: Vec<f32>,
    /// Width of the tile in pixels.
    width: u32,
    /// Height of the tile in pixels.
    height: u32,
    /// Geographic bounds.
    bounds: TileBounds,
    /// No-data value (elevations equal to this should be treated as missing).
    no_data_value: Option<f32>,
}

/// Geographic bounds of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileBounds {
    /// Minimum latitude (south edge).
    pub min_lat: f64,
    /// Maximum latitude (north edge).
    pub max_lat: f64,
    /// Minimum longitude (west edge).
    pub min_lon: f64,
    /// Maximum longitude (east edge).
    pub max_lon: f64,
}

impl TileBounds {
    /// Check if a coordinate is within the bounds (edges inclusive).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Check whether two footprints share any area (touching edges do not count).
    pub fn overlaps(&self, other: &TileBounds) -> bool {
        self.min_lat < other.max_lat
            && other.min_lat < self.max_lat
            && self.min_lon < other.max_lon
            && other.min_lon < self.max_lon
    }

    /// Smallest bounds enclosing both footprints.
    pub fn union(&self, other: &TileBounds) -> TileBounds {
        TileBounds {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    fn validate(self) -> Result<Self> {
        let finite = [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.max_lat <= self.min_lat || self.max_lon <= self.min_lon {
            return Err(DemError::InvalidBounds {
                min_lat: self.min_lat,
                max_lat: self.max_lat,
                min_lon: self.min_lon,
                max_lon: self.max_lon,
            });
        }
        Ok(self)
    }
}

impl ElevationTile {
    /// Build a tile from an already-decoded raster.
    pub fn from_raw(bounds: TileBounds, width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let bounds = bounds.validate()?;
        if data.len() != width as usize * height as usize {
            return Err(DemError::RasterSizeMismatch {
                width,
                height,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            bounds,
            no_data_value: None,
        })
    }

    /// Mark a sample value as "no data".
    pub fn with_no_data(mut self, value: f32) -> Self {
        self.no_data_value = Some(value);
        self
    }

    /// Decode a tile from GeoTIFF bytes.
    ///
    /// Bounds come from `bounds` when given, otherwise from the GeoTIFF
    /// tiepoint/pixel-scale tags, otherwise from a USGS-style `n##w###`
    /// pattern in `name_hint`.
    pub fn from_geotiff_bytes(
        bytes: &[u8],
        name_hint: Option<&str>,
        bounds: Option<TileBounds>,
    ) -> Result<Self> {
        let mut decoder = Decoder::new(Cursor::new(bytes))?;

        // 1/3 arc-second USGS tiles are 10812 x 10812 f32 pixels (~466 MB)
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;

        let bounds = match bounds {
            Some(bounds) => bounds,
            None => Self::read_geotransform(&mut decoder, name_hint)?,
        };

        let no_data_value = Self::read_nodata_value(&mut decoder);
        let data = Self::decode_elevation_data(&mut decoder)?;

        let tile = Self::from_raw(bounds, width, height, data)?;
        Ok(match no_data_value {
            Some(value) => tile.with_no_data(value),
            None => tile,
        })
    }

    /// Read the geographic bounds from GeoTIFF tags, falling back to the name.
    fn read_geotransform<R: Read + Seek>(
        decoder: &mut Decoder<R>,
        name_hint: Option<&str>,
    ) -> Result<TileBounds> {
        let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT));
        let pixel_scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE));

        if let (Ok(tiepoint), Ok(scale)) = (tiepoint, pixel_scale) {
            if tiepoint.len() >= 6 && scale.len() >= 2 {
                // Tiepoint format: [i, j, k, x, y, z]; (i, j) is the pixel anchoring (x, y)
                let (width, height) = decoder.dimensions()?;
                let west = tiepoint[3] - tiepoint[0] * scale[0];
                let north = tiepoint[4] + tiepoint[1] * scale[1];

                return Ok(TileBounds {
                    min_lat: north - height as f64 * scale[1],
                    max_lat: north,
                    min_lon: west,
                    max_lon: west + width as f64 * scale[0],
                });
            }
        }

        match name_hint {
            Some(name) => bounds_from_filename(name),
            None => Err(DemError::InvalidGeoTiff(
                "no georeferencing tags and no name to infer bounds from".to_string(),
            )),
        }
    }

    /// Decode elevation data from the TIFF decoder.
    fn decode_elevation_data<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
        let result = decoder.read_image()?;

        match result {
            DecodingResult::F32(data) => Ok(data),
            DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        }
    }

    /// Try to read the no-data value from the GDAL_NODATA tag.
    fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
        match decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA)) {
            Ok(text) => text.trim_matches(char::from(0)).trim().parse().ok(),
            Err(_) => Some(USGS_DEFAULT_NO_DATA),
        }
    }

    /// Map a geographic position to a raster `(row, col)`.
    ///
    /// `row = floor((max_lat - lat) / lat_span * height)` and the analogous
    /// rule on longitude. Positions whose cell falls outside the raster
    /// (including the south and east edges themselves) yield `None`.
    pub fn cell_for(&self, lat: f64, lon: f64) -> Option<(u32, u32)> {
        let lat_range = self.bounds.max_lat - self.bounds.min_lat;
        let lon_range = self.bounds.max_lon - self.bounds.min_lon;

        let row = ((self.bounds.max_lat - lat) / lat_range * self.height as f64).floor();
        let col = ((lon - self.bounds.min_lon) / lon_range * self.width as f64).floor();

        if !(row >= 0.0 && col >= 0.0) || row >= self.height as f64 || col >= self.width as f64 {
            return None;
        }
        Some((row as u32, col as u32))
    }

    /// Elevation of the cell containing `(lat, lon)`, if defined.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> Option<f32> {
        if !self.bounds.contains(lat, lon) {
            return None;
        }
        let (row, col) = self.cell_for(lat, lon)?;
        self.get_pixel(row, col)
    }

    /// Raw sample at a pixel, filtering no-data and non-finite values.
    fn get_pixel(&self, row: u32, col: u32) -> Option<f32> {
        let idx = row as usize * self.width as usize + col as usize;
        let value = *self.data.get(idx)?;

        if !value.is_finite() {
            return None;
        }
        if let Some(nodata) = self.no_data_value {
            if (value - nodata).abs() < 0.001 {
                return None;
            }
        }

        Some(value)
    }

    /// Get the geographic bounds of this tile.
    pub fn bounds(&self) -> TileBounds {
        self.bounds
    }

    /// Get the dimensions of this tile in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the resolution in degrees per pixel as `(lon, lat)`.
    pub fn resolution(&self) -> (f64, f64) {
        let lat_range = self.bounds.max_lat - self.bounds.min_lat;
        let lon_range = self.bounds.max_lon - self.bounds.min_lon;
        (lon_range / self.width as f64, lat_range / self.height as f64)
    }
}

/// Parse tile bounds from a USGS name such as `USGS_13_n48w123_20240327.tif`.
///
/// The `n48w123` token names the tile's north-west corner; tiles span one
/// degree in each direction.
pub(crate) fn bounds_from_filename(name: &str) -> Result<TileBounds> {
    let (lat, lon) =
        parse_corner_token(name).ok_or_else(|| DemError::InvalidFilename(name.to_string()))?;

    Ok(TileBounds {
        min_lat: lat - 1.0,
        max_lat: lat,
        min_lon: lon,
        max_lon: lon + 1.0,
    })
}

/// Find the first `[ns]<digits>[ew]<digits>` token and return the signed
/// north-west corner `(lat, lon)`.
fn parse_corner_token(name: &str) -> Option<(f64, f64)> {
    let bytes = name.as_bytes();

    for start in 0..bytes.len() {
        let lat_sign = match bytes[start] {
            b'n' | b'N' => 1.0,
            b's' | b'S' => -1.0,
            _ => continue,
        };

        let lat_end = digits_end(bytes, start + 1);
        if lat_end == start + 1 || lat_end >= bytes.len() {
            continue;
        }
        let lon_sign = match bytes[lat_end] {
            b'e' | b'E' => 1.0,
            b'w' | b'W' => -1.0,
            _ => continue,
        };
        let lon_end = digits_end(bytes, lat_end + 1);
        if lon_end == lat_end + 1 {
            continue;
        }

        let lat: f64 = name[start + 1..lat_end].parse().ok()?;
        let lon: f64 = name[lat_end + 1..lon_end].parse().ok()?;
        return Some((lat_sign * lat, lon_sign * lon));
    }

    None
}

fn digits_end(bytes: &[u8], from: usize) -> usize {
    let mut end = from;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    end
}
