//! Building features and the intersection filter.

use geo::{Geometry, Intersects};
use geojson::feature::Id;
use plotsurvey_geom::DrawnPolygon;
use serde_json::{Map, Value};

/// One footprint returned by the building query.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingFeature {
    /// OSM-style identifier, e.g. `way/123`.
    pub id: String,
    /// Geometry in `(lon, lat)` degrees.
    pub geometry: Geometry<f64>,
    /// Source tags.
    pub properties: Map<String, Value>,
}

impl BuildingFeature {
    /// Whether the geometry touches or overlaps the polygon.
    ///
    /// Geometry kinds the query never produces do not match.
    pub fn intersects(&self, polygon: &DrawnPolygon) -> bool {
        let area = polygon.polygon();
        match &self.geometry {
            Geometry::Polygon(g) => g.intersects(area),
            Geometry::MultiPolygon(g) => g.intersects(area),
            Geometry::LineString(g) => g.intersects(area),
            Geometry::Point(g) => g.intersects(area),
            _ => false,
        }
    }

    pub fn to_geojson(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: Some(Id::String(self.id.clone())),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }
}

/// Features kept by the intersection filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingSet {
    pub features: Vec<BuildingFeature>,
    /// How many features the query returned before filtering.
    pub returned: usize,
}

impl BuildingSet {
    /// Keep the features that intersect `polygon`, in their original order.
    pub fn filtered(features: Vec<BuildingFeature>, polygon: &DrawnPolygon) -> Self {
        let returned = features.len();
        let features = features
            .into_iter()
            .filter(|feature| feature.intersects(polygon))
            .collect();
        Self { features, returned }
    }

    pub fn count(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_feature_collection(&self) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(BuildingFeature::to_geojson).collect(),
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Point, Polygon};

    fn drawn() -> DrawnPolygon {
        DrawnPolygon::from_exterior(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]).unwrap()
    }

    fn footprint(id: &str, min: (f64, f64), size: f64) -> BuildingFeature {
        let ring = vec![
            min,
            (min.0 + size, min.1),
            (min.0 + size, min.1 + size),
            (min.0, min.1 + size),
            min,
        ];
        BuildingFeature {
            id: id.to_string(),
            geometry: Geometry::Polygon(Polygon::new(LineString::from(ring), Vec::new())),
            properties: Map::new(),
        }
    }

    #[test]
    fn test_inside_straddling_and_outside() {
        let polygon = drawn();
        assert!(footprint("inside", (0.2, 0.2), 0.1).intersects(&polygon));
        assert!(footprint("straddling", (0.9, 0.9), 0.3).intersects(&polygon));
        assert!(!footprint("outside", (2.0, 2.0), 0.1).intersects(&polygon));
    }

    #[test]
    fn test_touching_edge_counts() {
        assert!(footprint("touching", (1.0, 0.5), 0.2).intersects(&drawn()));
    }

    #[test]
    fn test_bbox_only_overlap_is_rejected() {
        // Triangle whose bbox covers the footprint but whose area does not
        let triangle = DrawnPolygon::from_exterior(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
        assert!(!footprint("corner", (0.8, 0.8), 0.1).intersects(&triangle));
    }

    #[test]
    fn test_point_and_line_geometries() {
        let polygon = drawn();
        let point = BuildingFeature {
            id: "node/1".to_string(),
            geometry: Geometry::Point(Point::new(0.5, 0.5)),
            properties: Map::new(),
        };
        let line = BuildingFeature {
            id: "way/2".to_string(),
            geometry: Geometry::LineString(LineString::from(vec![(-1.0, 0.5), (2.0, 0.5)])),
            properties: Map::new(),
        };
        assert!(point.intersects(&polygon));
        assert!(line.intersects(&polygon));
    }

    #[test]
    fn test_filtered_keeps_order_and_counts() {
        let polygon = drawn();
        let set = BuildingSet::filtered(
            vec![
                footprint("a", (0.1, 0.1), 0.1),
                footprint("b", (5.0, 5.0), 0.1),
                footprint("c", (0.5, 0.5), 0.1),
            ],
            &polygon,
        );
        assert_eq!(set.returned, 3);
        assert_eq!(set.count(), 2);
        let ids: Vec<&str> = set.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn test_feature_collection_output() {
        let mut feature = footprint("way/7", (0.1, 0.1), 0.1);
        feature
            .properties
            .insert("building".to_string(), Value::String("yes".to_string()));
        let set = BuildingSet {
            features: vec![feature],
            returned: 1,
        };

        let json = serde_json::to_value(set.to_feature_collection()).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["id"], "way/7");
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(json["features"][0]["properties"]["building"], "yes");
    }
}
