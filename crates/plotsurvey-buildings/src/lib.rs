//! # plotsurvey-buildings
//!
//! Building footprints inside a drawn polygon.
//!
//! The polygon's bounding box becomes an Overpass query for `building` ways;
//! the JSON response is assembled into features, and only features whose
//! geometry intersects the polygon itself are kept.
//!
//! ```no_run
//! use plotsurvey_buildings::{BuildingQueryConfig, BuildingSource, OverpassClient};
//! use plotsurvey_geom::DrawnPolygon;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OverpassClient::new(BuildingQueryConfig::default())?;
//! let polygon = DrawnPolygon::from_exterior(vec![
//!     (-118.29, 34.02), (-118.28, 34.02), (-118.28, 34.03), (-118.29, 34.03),
//! ])?;
//! let buildings = client.find_buildings(&polygon).await?;
//! println!("Total buildings in drawn area: {}", buildings.count());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod feature;
mod osm;
mod query;

pub use client::{
    BuildingQueryConfig, BuildingSource, OverpassClient, DEFAULT_CLIENT_TIMEOUT_SECS,
    DEFAULT_ENDPOINT,
};
pub use error::QueryError;
pub use feature::{BuildingFeature, BuildingSet};
pub use osm::{Element, OverpassResponse};
pub use query::{building_query, DEFAULT_QUERY_TIMEOUT_SECS};

/// Result type for building queries.
pub type Result<T> = std::result::Result<T, QueryError>;
