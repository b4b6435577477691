//! The drawn polygon: the immutable input to every analysis.

use crate::{BoundingBox, GeomError, Result};
use geo::{Coord, GeodesicArea, Intersects, LineString, Polygon};
use geojson::{GeoJson, Value};

/// A closed, simple polygon in `(lon, lat)` degrees, as drawn on the map.
///
/// Rings are closed on construction. The bounding box is derived once and
/// cached; the polygon is never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnPolygon {
    polygon: Polygon<f64>,
    bbox: BoundingBox,
}

impl DrawnPolygon {
    /// Wrap a `geo` polygon after checking its coordinates.
    pub fn new(polygon: Polygon<f64>) -> Result<Self> {
        for (index, coord) in polygon.exterior().coords().enumerate() {
            check_coord(index, coord.x, coord.y)?;
        }
        for ring in polygon.interiors() {
            for (index, coord) in ring.coords().enumerate() {
                check_coord(index, coord.x, coord.y)?;
            }
        }

        let distinct = distinct_vertices(polygon.exterior());
        if distinct < 3 {
            return Err(GeomError::DegenerateRing(distinct));
        }

        let bbox = BoundingBox::from_coords(polygon.exterior().coords().map(|c| (c.x, c.y)))
            .ok_or(GeomError::DegenerateRing(0))?;

        Ok(Self { polygon, bbox })
    }

    /// Build from an exterior ring of `(lon, lat)` pairs; closing is optional.
    pub fn from_exterior(ring: Vec<(f64, f64)>) -> Result<Self> {
        Self::new(Polygon::new(LineString::from(ring), Vec::new()))
    }

    /// Parse a GeoJSON document holding a Polygon.
    ///
    /// Accepts a bare Polygon geometry, a Feature wrapping one, or a
    /// FeatureCollection whose first feature wraps one.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let geojson: GeoJson = text.parse()?;
        match geojson {
            GeoJson::Geometry(geometry) => Self::from_geojson_value(&geometry.value),
            GeoJson::Feature(feature) => {
                let geometry = feature.geometry.ok_or(GeomError::MissingGeometry)?;
                Self::from_geojson_value(&geometry.value)
            }
            GeoJson::FeatureCollection(collection) => {
                let feature = collection
                    .features
                    .into_iter()
                    .next()
                    .ok_or(GeomError::EmptyCollection)?;
                let geometry = feature.geometry.ok_or(GeomError::MissingGeometry)?;
                Self::from_geojson_value(&geometry.value)
            }
        }
    }

    /// Convert a GeoJSON geometry value; only `Polygon` is accepted.
    pub fn from_geojson_value(value: &Value) -> Result<Self> {
        let Value::Polygon(rings) = value else {
            return Err(GeomError::UnsupportedGeometry(geometry_kind(value)));
        };

        let mut rings = rings.iter().map(|ring| ring_from_positions(ring));
        let exterior = match rings.next() {
            Some(ring) => ring?,
            None => return Err(GeomError::DegenerateRing(0)),
        };
        let interiors = rings.collect::<Result<Vec<_>>>()?;

        Self::new(Polygon::new(exterior, interiors))
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Exterior ring vertices as `(lon, lat)`, without the closing repeat.
    pub fn exterior_vertices(&self) -> Vec<(f64, f64)> {
        let ring = self.polygon.exterior();
        let mut vertices: Vec<(f64, f64)> = ring.coords().map(|c| (c.x, c.y)).collect();
        if ring.is_closed() && vertices.len() > 1 {
            vertices.pop();
        }
        vertices
    }

    /// All ring vertices, exterior then holes, without closing repeats.
    pub fn ring_vertices(&self) -> Vec<(f64, f64)> {
        let mut vertices = self.exterior_vertices();
        for ring in self.polygon.interiors() {
            let coords: Vec<(f64, f64)> = ring.coords().map(|c| (c.x, c.y)).collect();
            let open_len = coords.len().saturating_sub(1);
            vertices.extend_from_slice(&coords[..open_len]);
        }
        vertices
    }

    /// Point-in-polygon test; points on the boundary count as inside.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        self.bbox.contains(lon, lat) && self.polygon.intersects(&Coord { x: lon, y: lat })
    }

    /// Ellipsoidal (WGS84) area in square meters.
    ///
    /// Independent of vertex order and ring orientation.
    pub fn flat_area_sq_meters(&self) -> f64 {
        self.polygon.geodesic_area_unsigned()
    }

    /// GeoJSON geometry for handing back to the map.
    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(Value::from(&self.polygon))
    }
}

fn check_coord(index: usize, lon: f64, lat: f64) -> Result<()> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(GeomError::InvalidCoordinate {
            index,
            reason: "non-finite value".to_string(),
        });
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(GeomError::InvalidCoordinate {
            index,
            reason: format!("({lon}, {lat}) is outside the geographic range"),
        });
    }
    Ok(())
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Result<LineString<f64>> {
    positions
        .iter()
        .enumerate()
        .map(|(index, position)| match position.as_slice() {
            [lon, lat, ..] => Ok(Coord { x: *lon, y: *lat }),
            _ => Err(GeomError::InvalidCoordinate {
                index,
                reason: format!("position has {} element(s)", position.len()),
            }),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn distinct_vertices(ring: &LineString<f64>) -> usize {
    let mut keys: Vec<(u64, u64)> = ring
        .coords()
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(min: f64, size: f64) -> Vec<(f64, f64)> {
        vec![
            (min, min),
            (min + size, min),
            (min + size, min + size),
            (min, min + size),
            (min, min),
        ]
    }

    #[test]
    fn test_equator_square_area() {
        // 0.002 degrees is ~222 m at the equator
        let polygon = DrawnPolygon::from_exterior(square(0.0, 0.002)).unwrap();
        let area = polygon.flat_area_sq_meters();
        assert_relative_eq!(area, 49_300.0, max_relative = 0.01);
    }

    #[test]
    fn test_area_invariant_under_vertex_reordering() {
        let ring = square(0.0, 0.002);
        let base = DrawnPolygon::from_exterior(ring.clone()).unwrap().flat_area_sq_meters();

        let mut reversed = ring.clone();
        reversed.reverse();
        let reversed = DrawnPolygon::from_exterior(reversed).unwrap().flat_area_sq_meters();

        // Same ring starting from the third vertex
        let mut rotated: Vec<(f64, f64)> = ring[2..4].to_vec();
        rotated.extend_from_slice(&ring[0..2]);
        let rotated = DrawnPolygon::from_exterior(rotated).unwrap().flat_area_sq_meters();

        assert_relative_eq!(base, reversed, max_relative = 1e-9);
        assert_relative_eq!(base, rotated, max_relative = 1e-9);
    }

    #[test]
    fn test_unclosed_ring_is_closed() {
        let polygon = DrawnPolygon::from_exterior(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
        assert!(polygon.polygon().exterior().is_closed());
        assert_eq!(polygon.exterior_vertices().len(), 3);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let err = DrawnPolygon::from_exterior(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, GeomError::DegenerateRing(2)));
    }

    #[test]
    fn test_out_of_range_coordinate_rejected() {
        let err = DrawnPolygon::from_exterior(vec![(0.0, 0.0), (200.0, 0.0), (0.0, 1.0)]).unwrap_err();
        assert!(matches!(err, GeomError::InvalidCoordinate { index: 1, .. }));
    }

    #[test]
    fn test_contains_point_boundary_inclusive() {
        let polygon = DrawnPolygon::from_exterior(square(0.0, 1.0)).unwrap();
        assert!(polygon.contains_point(0.5, 0.5));
        assert!(polygon.contains_point(0.0, 0.5));
        assert!(polygon.contains_point(1.0, 1.0));
        assert!(!polygon.contains_point(1.5, 0.5));
    }

    #[test]
    fn test_contains_point_respects_holes() {
        let exterior = LineString::from(square(0.0, 3.0));
        let hole = LineString::from(square(1.0, 1.0));
        let polygon = DrawnPolygon::new(Polygon::new(exterior, vec![hole])).unwrap();

        assert!(polygon.contains_point(0.5, 0.5));
        assert!(!polygon.contains_point(1.5, 1.5));
        assert_eq!(polygon.ring_vertices().len(), 8);
    }

    #[test]
    fn test_parse_bare_polygon() {
        let text = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#;
        let polygon = DrawnPolygon::from_geojson_str(text).unwrap();
        assert_eq!(polygon.bbox().max_lon, 1.0);
    }

    #[test]
    fn test_parse_feature_and_collection() {
        let feature = serde_json::json!({
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [[[10, 20], [11, 20], [11, 21], [10, 20]]]}
        });
        let from_feature = DrawnPolygon::from_geojson_str(&feature.to_string()).unwrap();
        assert_eq!(from_feature.bbox().min_lat, 20.0);

        let collection = serde_json::json!({"type": "FeatureCollection", "features": [feature]});
        let from_collection = DrawnPolygon::from_geojson_str(&collection.to_string()).unwrap();
        assert_eq!(from_feature, from_collection);
    }

    #[test]
    fn test_parse_rejects_other_geometry() {
        let text = r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#;
        let err = DrawnPolygon::from_geojson_str(text).unwrap_err();
        assert!(matches!(err, GeomError::UnsupportedGeometry("LineString")));

        let empty = r#"{"type":"FeatureCollection","features":[]}"#;
        assert!(matches!(
            DrawnPolygon::from_geojson_str(empty).unwrap_err(),
            GeomError::EmptyCollection
        ));
    }

    #[test]
    fn test_to_geojson_roundtrip() {
        let polygon = DrawnPolygon::from_exterior(square(2.0, 0.5)).unwrap();
        let value = polygon.to_geojson().value;
        assert_eq!(DrawnPolygon::from_geojson_value(&value).unwrap(), polygon);
    }
}
