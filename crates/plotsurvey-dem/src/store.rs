//! Elevation store: the set of loaded tiles and point lookups across it.

use crate::tile::TileBounds;
use crate::{DemError, ElevationTile, Result, TileSource};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Default timeout for fetching a single remote tile.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Options controlling [`ElevationStore::load`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// On-disk cache for AWS terrain tiles.
    pub cache_dir: Option<PathBuf>,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// A tile that could not be loaded; it is left out of the active set.
#[derive(Debug)]
pub struct TileLoadFailure {
    /// Human-readable tile source.
    pub source: String,
    /// Why it failed.
    pub error: DemError,
}

/// Outcome of a [`ElevationStore::load`] call.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Sources that were registered, in precedence order.
    pub loaded: Vec<String>,
    /// Sources that failed to fetch or decode.
    pub failed: Vec<TileLoadFailure>,
}

#[derive(Debug)]
struct RegisteredTile {
    label: String,
    tile: ElevationTile,
}

/// Immutable-after-load set of elevation tiles.
///
/// Lookups scan tiles in registration order and the first tile whose bounds
/// contain the point decides the answer, so when tiles overlap the one
/// registered earlier takes precedence. Overlaps are logged at registration.
///
/// Once built the store is read-only and can be shared behind an `Arc`
/// between concurrent readers without locking.
///
/// # Example
///
/// ```no_run
/// use plotsurvey_dem::{ElevationStore, LoadOptions, TileSource};
///
/// # async fn run() {
/// let sources = vec![TileSource::path("dem/USGS_13_n35w119.tif")];
/// let (store, report) = ElevationStore::load(sources, &LoadOptions::default()).await;
/// for failure in &report.failed {
///     eprintln!("skipped {}: {}", failure.source, failure.error);
/// }
/// println!("{:?}", store.elevation_at(34.02, -118.28));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ElevationStore {
    tiles: Vec<RegisteredTile>,
}

impl ElevationStore {
    /// Create an empty store. Every lookup yields `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-decoded tiles, in precedence order.
    pub fn from_tiles(tiles: Vec<ElevationTile>) -> Self {
        let mut store = Self::new();
        for (i, tile) in tiles.into_iter().enumerate() {
            store.register(format!("tile#{i}"), tile);
        }
        store
    }

    /// Fetch and decode every source concurrently.
    ///
    /// Tiles are registered in the order of `sources`, not in completion
    /// order, so lookup precedence is deterministic. Failures are logged and
    /// reported; they never abort the load.
    pub async fn load(sources: Vec<TileSource>, options: &LoadOptions) -> (Self, LoadReport) {
        let mut report = LoadReport::default();

        let client = match reqwest::Client::builder().timeout(options.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Could not build HTTP client for tile loading");
                for source in &sources {
                    report.failed.push(TileLoadFailure {
                        source: source.to_string(),
                        error: DemError::TaskFailed(message.clone()),
                    });
                }
                return (Self::new(), report);
            }
        };

        let mut tasks = JoinSet::new();
        for (index, source) in sources.iter().cloned().enumerate() {
            let client = client.clone();
            let cache_dir = options.cache_dir.clone();
            tasks.spawn(async move {
                let result = load_one(&source, &client, cache_dir).await;
                (index, result)
            });
        }

        let mut outcomes: Vec<Option<Result<ElevationTile>>> =
            std::iter::repeat_with(|| None).take(sources.len()).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => outcomes[index] = Some(result),
                Err(e) => warn!(error = %e, "Tile load task did not complete"),
            }
        }

        let mut store = Self::new();
        for (source, outcome) in sources.iter().zip(outcomes) {
            let label = source.to_string();
            match outcome {
                Some(Ok(tile)) => {
                    store.register(label.clone(), tile);
                    report.loaded.push(label);
                }
                Some(Err(error)) => {
                    warn!(tile = %label, error = %error, "Excluding elevation tile");
                    report.failed.push(TileLoadFailure { source: label, error });
                }
                None => {
                    warn!(tile = %label, "Excluding elevation tile (task aborted)");
                    report.failed.push(TileLoadFailure {
                        source: label,
                        error: DemError::TaskFailed("task aborted".to_string()),
                    });
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Elevation store ready"
        );
        (store, report)
    }

    /// Append a tile with the lowest precedence so far.
    pub fn register(&mut self, label: String, tile: ElevationTile) {
        let bounds = tile.bounds();
        for existing in &self.tiles {
            if existing.tile.bounds().overlaps(&bounds) {
                warn!(
                    tile = %label,
                    shadowed_by = %existing.label,
                    "Overlapping elevation tiles; the earlier tile wins in the shared area"
                );
            }
        }

        let (lon_res, lat_res) = tile.resolution();
        debug!(tile = %label, ?bounds, lon_res, lat_res, "Registered elevation tile");
        self.tiles.push(RegisteredTile { label, tile });
    }

    /// Elevation at a geographic coordinate, from the first tile covering it.
    ///
    /// Returns `None` when no tile covers the point, when the covering tile's
    /// cell is out of range, or when the cell holds no data.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> Option<f32> {
        self.tiles
            .iter()
            .find(|t| t.tile.bounds().contains(lat, lon))
            .and_then(|t| t.tile.elevation_at(lat, lon))
    }

    /// Whether any tile's bounds contain the point.
    pub fn covers(&self, lat: f64, lon: f64) -> bool {
        self.tiles.iter().any(|t| t.tile.bounds().contains(lat, lon))
    }

    /// Number of registered tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Whether no tile is registered.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Bounding box enclosing every registered tile.
    pub fn coverage(&self) -> Option<TileBounds> {
        self.tiles
            .iter()
            .map(|t| t.tile.bounds())
            .reduce(|a, b| a.union(&b))
    }
}

/// Fetch then decode a single source; decoding runs on the blocking pool.
async fn load_one(
    source: &TileSource,
    client: &reqwest::Client,
    cache_dir: Option<PathBuf>,
) -> Result<ElevationTile> {
    let bytes = source.fetch_bytes(client, cache_dir.as_deref()).await?;

    let name_hint = source.name_hint().map(str::to_owned);
    let bounds = source.known_bounds();
    tokio::task::spawn_blocking(move || {
        ElevationTile::from_geotiff_bytes(&bytes, name_hint.as_deref(), bounds)
    })
    .await
    .map_err(|e| DemError::TaskFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_tile(min_lon: f64, max_lon: f64, value: f32) -> ElevationTile {
        let bounds = TileBounds {
            min_lat: 0.0,
            max_lat: 1.0,
            min_lon,
            max_lon,
        };
        ElevationTile::from_raw(bounds, 2, 2, vec![value; 4]).unwrap()
    }

    #[test]
    fn test_empty_store_has_no_elevation() {
        let store = ElevationStore::new();
        assert!(store.is_empty());
        assert_eq!(store.elevation_at(0.5, 0.5), None);
        assert!(store.coverage().is_none());
    }

    #[test]
    fn test_first_registered_tile_wins() {
        let store = ElevationStore::from_tiles(vec![
            flat_tile(0.0, 1.0, 10.0),
            flat_tile(0.5, 1.5, 20.0),
        ]);

        assert_eq!(store.elevation_at(0.5, 0.75), Some(10.0));
        assert_eq!(store.elevation_at(0.5, 1.25), Some(20.0));
        assert_eq!(store.tile_count(), 2);
    }

    #[test]
    fn test_first_containing_tile_decides_even_at_its_edge() {
        // lon 1.0 is on the east edge of the first tile: contained, but the
        // cell is out of range, so the lookup is undefined.
        let store = ElevationStore::from_tiles(vec![
            flat_tile(0.0, 1.0, 10.0),
            flat_tile(1.0, 2.0, 20.0),
        ]);

        assert_eq!(store.elevation_at(0.5, 1.0), None);
        assert!(store.covers(0.5, 1.0));
    }

    #[test]
    fn test_coverage_is_union() {
        let store = ElevationStore::from_tiles(vec![
            flat_tile(0.0, 1.0, 1.0),
            flat_tile(3.0, 4.0, 1.0),
        ]);
        let coverage = store.coverage().unwrap();
        assert_eq!(coverage.min_lon, 0.0);
        assert_eq!(coverage.max_lon, 4.0);
    }
}
