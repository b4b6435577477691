//! Building sources: the Overpass HTTP client and the trait the orchestrator
//! drives.

use crate::query::{building_query, DEFAULT_QUERY_TIMEOUT_SECS};
use crate::{BuildingFeature, BuildingSet, OverpassResponse, QueryError, Result};
use async_trait::async_trait;
use plotsurvey_geom::{BoundingBox, DrawnPolygon};
use plotsurvey_metrics::metric_defs;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Client-side timeout; a little above the server-side budget.
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;

/// Where to send building queries and how long to wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingQueryConfig {
    pub endpoint: String,
    /// Server-side `[timeout:N]` budget, seconds.
    pub timeout_secs: u32,
    /// Whole-request timeout on the client, seconds.
    pub client_timeout_secs: u64,
}

impl Default for BuildingQueryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            client_timeout_secs: DEFAULT_CLIENT_TIMEOUT_SECS,
        }
    }
}

/// Anything that can return building footprints for a bounding box.
#[async_trait]
pub trait BuildingSource: Send + Sync {
    /// Every footprint the source has in `bbox`, unfiltered.
    async fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<BuildingFeature>>;

    /// Footprints intersecting `polygon`.
    ///
    /// The bounding box is a coarse prefilter; the polygon intersection test
    /// decides.
    async fn find_buildings(&self, polygon: &DrawnPolygon) -> Result<BuildingSet> {
        let features = self.fetch(&polygon.bbox()).await?;
        let set = BuildingSet::filtered(features, polygon);

        metrics::histogram!(metric_defs::BUILDINGS_RETURNED.name).record(set.returned as f64);
        metrics::histogram!(metric_defs::BUILDINGS_KEPT.name).record(set.count() as f64);
        debug!(returned = set.returned, kept = set.count(), "Filtered buildings");
        Ok(set)
    }
}

/// Building source backed by an Overpass API endpoint.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    http_client: reqwest::Client,
    config: BuildingQueryConfig,
}

impl OverpassClient {
    pub fn new(config: BuildingQueryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("plotsurvey/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.client_timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &BuildingQueryConfig {
        &self.config
    }
}

#[async_trait]
impl BuildingSource for OverpassClient {
    async fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<BuildingFeature>> {
        let query = building_query(bbox, self.config.timeout_secs);
        let started = Instant::now();

        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&[("data", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let text = response.text().await?;
        let features = OverpassResponse::parse(&text)?.into_features();

        let elapsed = started.elapsed();
        metrics::histogram!(metric_defs::BUILDING_QUERY_DURATION.name).record(elapsed.as_secs_f64());
        info!(
            features = features.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Building query complete"
        );
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuildingQueryConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout_secs, 25);
        assert!(config.client_timeout_secs > u64::from(config.timeout_secs));
    }

    #[test]
    fn test_client_builds() {
        let client = OverpassClient::new(BuildingQueryConfig::default()).unwrap();
        assert_eq!(client.config().timeout_secs, 25);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let client = OverpassClient::new(BuildingQueryConfig {
            // Port 9 (discard) on localhost: connection refused
            endpoint: "http://127.0.0.1:9/api/interpreter".to_string(),
            timeout_secs: 1,
            client_timeout_secs: 2,
        })
        .unwrap();
        let bbox = BoundingBox {
            min_lon: 0.0,
            min_lat: 0.0,
            max_lon: 0.001,
            max_lat: 0.001,
        };
        let err = client.fetch(&bbox).await.unwrap_err();
        assert_eq!(err.kind(), "http");
    }
}
