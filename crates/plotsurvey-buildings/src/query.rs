//! Overpass QL text for a bounding-box building query.

use plotsurvey_geom::BoundingBox;

/// Server-side query budget, seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u32 = 25;

/// Query every `building`-tagged way in `bbox`, then recurse down to the
/// ways' nodes so geometry can be assembled client-side.
///
/// Overpass expects the box as `(south, west, north, east)`.
pub fn building_query(bbox: &BoundingBox, timeout_secs: u32) -> String {
    format!(
        "[out:json][timeout:{timeout_secs}];\n(\n  way[\"building\"]({},{},{},{});\n);\nout body;\n>;\nout skel qt;\n",
        bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_text() {
        let bbox = BoundingBox {
            min_lon: -118.29,
            min_lat: 34.02,
            max_lon: -118.28,
            max_lat: 34.03,
        };
        let query = building_query(&bbox, 25);
        assert_eq!(
            query,
            "[out:json][timeout:25];\n(\n  way[\"building\"](34.02,-118.29,34.03,-118.28);\n);\nout body;\n>;\nout skel qt;\n"
        );
    }

    #[test]
    fn test_query_timeout() {
        let bbox = BoundingBox {
            min_lon: 0.0,
            min_lat: 0.0,
            max_lon: 1.0,
            max_lat: 1.0,
        };
        assert!(building_query(&bbox, 60).starts_with("[out:json][timeout:60];"));
    }
}
