//! Axis-aligned longitude/latitude bounding boxes.

use serde::{Deserialize, Serialize};

/// Rectangle in geographic coordinates, `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Smallest box enclosing every `(lon, lat)` pair, or `None` if empty.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = coords.into_iter();
        let (lon, lat) = iter.next()?;
        let mut bbox = BoundingBox {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        };
        for (lon, lat) in iter {
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.max_lat = bbox.max_lat.max(lat);
        }
        Some(bbox)
    }

    /// Inclusive on every edge.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    pub fn width_deg(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height_deg(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// `(lon, lat)` of the box centre.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) * 0.5,
            (self.min_lat + self.max_lat) * 0.5,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coords() {
        let bbox = BoundingBox::from_coords([(1.0, 5.0), (-2.0, 3.0), (0.5, 7.0)]).unwrap();
        assert_eq!(bbox.min_lon, -2.0);
        assert_eq!(bbox.max_lon, 1.0);
        assert_eq!(bbox.min_lat, 3.0);
        assert_eq!(bbox.max_lat, 7.0);
        assert_eq!(bbox.center(), (-0.5, 5.0));
    }

    #[test]
    fn test_from_no_coords() {
        assert!(BoundingBox::from_coords(std::iter::empty()).is_none());
    }

    #[test]
    fn test_contains_is_edge_inclusive() {
        let bbox = BoundingBox::from_coords([(0.0, 0.0), (1.0, 1.0)]).unwrap();
        assert!(bbox.contains(0.0, 0.0));
        assert!(bbox.contains(1.0, 0.5));
        assert!(!bbox.contains(1.0001, 0.5));
    }
}
