//! Startup: load elevation, wire the building client and sampler, and kick
//! off overlay loading.

use crate::config::AnalysisConfig;
use crate::events::AnalysisEvent;
use crate::orchestrator::Orchestrator;
use crate::overlay::load_overlay;
use crate::AnalysisError;
use plotsurvey_buildings::OverpassClient;
use plotsurvey_dem::{ElevationStore, LoadReport, TileSource};
use plotsurvey_metrics::metric_defs;
use plotsurvey_surface::SurfaceSampler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A ready orchestrator plus what happened while starting it.
pub struct Session {
    pub orchestrator: Orchestrator,
    pub events: mpsc::UnboundedReceiver<AnalysisEvent>,
    pub load_report: LoadReport,
}

/// Build a session from configuration.
///
/// `extra_tiles` are appended after the configured tiles, so configured tiles
/// keep precedence. Tile failures are reported as events, never as an error.
/// Overlays load in the background and arrive as events.
pub async fn start(config: &AnalysisConfig, extra_tiles: Vec<TileSource>) -> Result<Session, AnalysisError> {
    config.validate()?;
    let reprojector = config.reprojector()?;

    let mut sources = config.elevation.tiles.clone();
    sources.extend(extra_tiles);
    info!(tiles = sources.len(), "Loading elevation tiles");
    let (store, load_report) = ElevationStore::load(sources, &config.elevation.load_options()).await;

    metrics::gauge!(metric_defs::DEM_TILES_LOADED.name).set(store.tile_count() as f64);
    metrics::counter!(metric_defs::DEM_TILE_FAILURES.name).increment(load_report.failed.len() as u64);
    if store.is_empty() {
        warn!("No elevation tiles loaded; terrain-aware area will be zero");
    }

    let buildings = OverpassClient::new(config.buildings.clone())?;
    let sampler = SurfaceSampler::new(Arc::new(store), reprojector, config.surface.clone());
    let (orchestrator, events) = Orchestrator::new(Arc::new(buildings), sampler);
    orchestrator.report_tile_failures(&load_report);

    if !config.overlays.is_empty() {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.buildings.client_timeout_secs))
            .build()
            .map_err(plotsurvey_buildings::QueryError::from)?;

        for source in config.overlays.clone() {
            let orchestrator = orchestrator.clone();
            let http_client = http_client.clone();
            tokio::spawn(async move {
                let event = match load_overlay(&source, &http_client).await {
                    Ok(features) => {
                        info!(overlay = %source, features = features.features.len(), "Overlay loaded");
                        AnalysisEvent::OverlayLoaded {
                            source: source.to_string(),
                            features: Arc::new(features),
                        }
                    }
                    Err(e) => {
                        warn!(overlay = %source, error = %e, "Overlay failed to load");
                        AnalysisEvent::OverlayFailed {
                            source: source.to_string(),
                            error: e.to_string(),
                        }
                    }
                };
                orchestrator.emit(event);
            });
        }
    }

    Ok(Session {
        orchestrator,
        events,
        load_report,
    })
}
