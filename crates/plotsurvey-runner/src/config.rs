//! Analysis configuration, loaded from YAML.

use crate::overlay::OverlaySource;
use plotsurvey_buildings::BuildingQueryConfig;
use plotsurvey_dem::{LoadOptions, TileSource};
use plotsurvey_geom::Reprojector;
use plotsurvey_surface::SurfaceConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Projection used when the configuration names none (UTM zone 11 north,
/// southern California).
pub const DEFAULT_PROJECTION: &str = "utm zone=11";

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Elevation tile set. Source order is lookup precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    /// On-disk cache for AWS terrain tiles.
    pub cache_dir: Option<PathBuf>,
    /// Per-tile fetch timeout, seconds.
    pub fetch_timeout_secs: u64,
    pub tiles: Vec<TileSource>,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            fetch_timeout_secs: 60,
            tiles: Vec::new(),
        }
    }
}

impl ElevationConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            cache_dir: self.cache_dir.clone(),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

/// Top-level configuration.
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// `geodesy` operator definition for planar area math.
    pub projection: String,
    pub surface: SurfaceConfig,
    pub buildings: BuildingQueryConfig,
    pub elevation: ElevationConfig,
    /// Static feature collections handed to the map unchanged.
    pub overlays: Vec<OverlaySource>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            projection: DEFAULT_PROJECTION.to_string(),
            surface: SurfaceConfig::default(),
            buildings: BuildingQueryConfig::default(),
            elevation: ElevationConfig::default(),
            overlays: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.surface
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.buildings.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("buildings.endpoint is empty".to_string()));
        }
        if self.buildings.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "buildings.timeout_secs must be positive".to_string(),
            ));
        }
        if self.buildings.client_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "buildings.client_timeout_secs must be positive".to_string(),
            ));
        }
        if self.elevation.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "elevation.fetch_timeout_secs must be positive".to_string(),
            ));
        }

        self.reprojector()?;
        Ok(())
    }

    pub fn reprojector(&self) -> Result<Reprojector, ConfigError> {
        Reprojector::new(&self.projection).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotsurvey_dem::{TileCoord, TileLocation};

    #[test]
    fn test_empty_document_is_default() {
        let config = AnalysisConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.projection, "utm zone=11");
        assert_eq!(config.surface.grid_spacing_deg, 0.0003);
        assert_eq!(config.buildings.timeout_secs, 25);
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
projection: "utm zone=31"
surface:
  grid_spacing_deg: 0.0005
  include_ring_vertices: false
buildings:
  endpoint: "http://localhost:12345/api/interpreter"
  timeout_secs: 10
  client_timeout_secs: 15
elevation:
  cache_dir: /tmp/dem-cache
  tiles:
    - path: dem/USGS_13_n35w119.tif
    - url: https://example.org/tile.tif
      bounds: { min_lon: -118.3, min_lat: 34.0, max_lon: -118.2, max_lat: 34.1 }
    - aws: { z: 12, x: 702, y: 1635 }
overlays:
  - path: overlays/transmission_lines.geojson
  - url: https://example.org/fire_stations.geojson
"#;
        let config = AnalysisConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.surface.grid_spacing_deg, 0.0005);
        assert!(!config.surface.include_ring_vertices);
        assert_eq!(config.buildings.client_timeout_secs, 15);
        assert_eq!(config.elevation.cache_dir, Some(PathBuf::from("/tmp/dem-cache")));
        assert_eq!(config.elevation.tiles.len(), 3);
        assert!(matches!(config.elevation.tiles[0].location, TileLocation::Path(_)));
        assert!(config.elevation.tiles[1].bounds.is_some());
        assert_eq!(
            config.elevation.tiles[2].location,
            TileLocation::Aws(TileCoord { z: 12, x: 702, y: 1635 })
        );
        assert_eq!(config.overlays.len(), 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_spacing = "surface:\n  grid_spacing_deg: -1.0\n";
        assert!(matches!(
            AnalysisConfig::from_yaml_str(bad_spacing),
            Err(ConfigError::Invalid(_))
        ));

        let bad_projection = "projection: \"not_a_projection\"\n";
        assert!(matches!(
            AnalysisConfig::from_yaml_str(bad_projection),
            Err(ConfigError::Invalid(_))
        ));

        let bad_timeout = "buildings:\n  timeout_secs: 0\n";
        assert!(AnalysisConfig::from_yaml_str(bad_timeout).is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            AnalysisConfig::from_yaml_str("surface: [unclosed"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
