//! Overpass JSON responses and their conversion to features.

use crate::BuildingFeature;
use geo::{Geometry, LineString, Point, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Top level of an `[out:json]` Overpass response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Set by the server on partial failures such as a query timeout.
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: Map<String, Value>,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        tags: Map<String, Value>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        tags: Map<String, Value>,
    },
    #[serde(other)]
    Other,
}

impl OverpassResponse {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Assemble features from the response's elements, in element order.
    ///
    /// - A way becomes a Polygon when it is closed with at least four
    ///   positions, otherwise a LineString. Node references missing from the
    ///   response are skipped; ways left with fewer than two positions are
    ///   dropped.
    /// - A node becomes a Point only if it carries tags; the bare nodes that
    ///   make up way geometry do not.
    /// - Relations are not assembled.
    pub fn into_features(self) -> Vec<BuildingFeature> {
        if let Some(remark) = &self.remark {
            warn!(remark = %remark, "Overpass response carries a remark; results may be partial");
        }

        let nodes: HashMap<i64, (f64, f64)> = self
            .elements
            .iter()
            .filter_map(|element| match element {
                Element::Node { id, lat, lon, .. } => Some((*id, (*lon, *lat))),
                _ => None,
            })
            .collect();

        let mut features = Vec::new();
        for element in self.elements {
            match element {
                Element::Node { id, lat, lon, tags } if !tags.is_empty() => {
                    features.push(BuildingFeature {
                        id: format!("node/{id}"),
                        geometry: Geometry::Point(Point::new(lon, lat)),
                        properties: tags,
                    });
                }
                Element::Node { .. } => {}
                Element::Way { id, nodes: refs, tags } => {
                    if let Some(geometry) = way_geometry(id, &refs, &nodes) {
                        features.push(BuildingFeature {
                            id: format!("way/{id}"),
                            geometry,
                            properties: tags,
                        });
                    }
                }
                Element::Relation { id, .. } => {
                    debug!(relation = id, "Skipping relation");
                }
                Element::Other => {}
            }
        }
        features
    }
}

fn way_geometry(id: i64, refs: &[i64], nodes: &HashMap<i64, (f64, f64)>) -> Option<Geometry<f64>> {
    let coords: Vec<(f64, f64)> = refs.iter().filter_map(|r| nodes.get(r).copied()).collect();
    if coords.len() < refs.len() {
        debug!(way = id, missing = refs.len() - coords.len(), "Way references unknown nodes");
    }
    if coords.len() < 2 {
        debug!(way = id, "Way has too few resolved nodes");
        return None;
    }

    let closed = coords.len() >= 4 && coords.first() == coords.last();
    let line = LineString::from(coords);
    Some(if closed {
        Geometry::Polygon(Polygon::new(line, Vec::new()))
    } else {
        Geometry::LineString(line)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
      "version": 0.6,
      "generator": "Overpass API",
      "elements": [
        {"type": "way", "id": 10, "nodes": [1, 2, 3, 4, 1], "tags": {"building": "yes", "name": "Hall"}},
        {"type": "way", "id": 11, "nodes": [1, 2, 3], "tags": {"building": "garage"}},
        {"type": "way", "id": 12, "nodes": [1, 99], "tags": {"building": "shed"}},
        {"type": "relation", "id": 20, "members": [], "tags": {"building": "yes"}},
        {"type": "node", "id": 1, "lat": 34.0, "lon": -118.0},
        {"type": "node", "id": 2, "lat": 34.0, "lon": -117.9},
        {"type": "node", "id": 3, "lat": 34.1, "lon": -117.9},
        {"type": "node", "id": 4, "lat": 34.1, "lon": -118.0},
        {"type": "node", "id": 5, "lat": 34.05, "lon": -117.95, "tags": {"building": "kiosk"}},
        {"type": "area", "id": 30}
      ]
    }"#;

    #[test]
    fn test_parse_and_convert() {
        let features = OverpassResponse::parse(RESPONSE).unwrap().into_features();
        let ids: Vec<&str> = features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["way/10", "way/11", "node/5"]);

        assert!(matches!(features[0].geometry, Geometry::Polygon(_)));
        assert_eq!(features[0].properties["name"], "Hall");
        assert!(matches!(features[1].geometry, Geometry::LineString(_)));
        assert!(matches!(features[2].geometry, Geometry::Point(_)));
    }

    #[test]
    fn test_polygon_coordinates_are_lon_lat() {
        let features = OverpassResponse::parse(RESPONSE).unwrap().into_features();
        let Geometry::Polygon(polygon) = &features[0].geometry else {
            panic!("expected polygon");
        };
        let first = polygon.exterior().0[0];
        assert_eq!((first.x, first.y), (-118.0, 34.0));
        assert_eq!(polygon.exterior().0.len(), 5);
    }

    #[test]
    fn test_empty_response() {
        let response = OverpassResponse::parse(r#"{"version": 0.6, "elements": []}"#).unwrap();
        assert!(response.into_features().is_empty());

        let bare = OverpassResponse::parse("{}").unwrap();
        assert!(bare.elements.is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(OverpassResponse::parse("<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_remark_is_kept() {
        let text = r#"{"elements": [], "remark": "runtime error: Query timed out"}"#;
        let response = OverpassResponse::parse(text).unwrap();
        assert!(response.remark.as_deref().unwrap().contains("timed out"));
    }
}
