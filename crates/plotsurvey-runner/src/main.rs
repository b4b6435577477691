//! `plotsurvey`: analyze one or more drawn polygons from the command line.
//!
//! Each `--polygon` is drawn in turn, as a user redrawing on the map would.
//! Only the last polygon's analysis is reported.

use clap::Parser;
use plotsurvey_dem::{TileBounds, TileSource};
use plotsurvey_geom::DrawnPolygon;
use plotsurvey_runner::{session, AnalysisConfig, EventLogger};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plotsurvey", version, about = "Building count and terrain-aware area for drawn polygons")]
struct Args {
    /// YAML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// GeoJSON polygon to analyze (Geometry, Feature or FeatureCollection).
    /// Repeat to simulate redrawing; the last one wins.
    #[arg(short, long, required = true)]
    polygon: Vec<PathBuf>,

    /// Write the JSON report, including filtered buildings, here.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also fetch AWS terrain tiles at this zoom covering each polygon.
    #[arg(long)]
    aws_zoom: Option<u8>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Serve Prometheus metrics on this port (requires the `prometheus` feature).
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(args).await {
        Ok(code) => code,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, String> {
    #[cfg(feature = "prometheus")]
    if let Some(port) = args.metrics_port {
        plotsurvey_metrics::install_prometheus(port)
            .map_err(|e| format!("Failed to start metrics exporter: {e}"))?;
        info!(port, "Serving Prometheus metrics");
    }
    #[cfg(not(feature = "prometheus"))]
    if args.metrics_port.is_some() {
        warn!("--metrics-port ignored: built without the prometheus feature");
    }

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .map_err(|e| format!("{}: {e}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let mut polygons = Vec::with_capacity(args.polygon.len());
    for path in &args.polygon {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))?;
        let polygon =
            DrawnPolygon::from_geojson_str(&text).map_err(|e| format!("{}: {e}", path.display()))?;
        polygons.push(polygon);
    }

    let mut extra_tiles = Vec::new();
    if let Some(zoom) = args.aws_zoom {
        for polygon in &polygons {
            let bbox = polygon.bbox();
            let bounds = TileBounds {
                min_lat: bbox.min_lat,
                max_lat: bbox.max_lat,
                min_lon: bbox.min_lon,
                max_lon: bbox.max_lon,
            };
            let covering = TileSource::aws_covering(&bounds, zoom).map_err(|e| e.to_string())?;
            for source in covering {
                if !extra_tiles.contains(&source) {
                    extra_tiles.push(source);
                }
            }
        }
    }

    let session = session::start(&config, extra_tiles)
        .await
        .map_err(|e| e.to_string())?;
    let orchestrator = session.orchestrator;
    info!(
        tiles_loaded = session.load_report.loaded.len(),
        tiles_failed = session.load_report.failed.len(),
        "Session ready"
    );

    let logger = EventLogger::spawn(session.events);

    for polygon in polygons {
        orchestrator.on_polygon_drawn(polygon);
    }
    orchestrator.wait_idle().await;

    let outcome = match (orchestrator.last_error(), orchestrator.last_result()) {
        (Some(error), _) => Err(format!("Analysis failed: {error}")),
        (None, Some(result)) => {
            println!("{}", result.summary());
            if let Some(path) = &args.output {
                let json = serde_json::to_string_pretty(&result.report())
                    .map_err(|e| format!("Failed to encode report: {e}"))?;
                tokio::fs::write(path, json)
                    .await
                    .map_err(|e| format!("{}: {e}", path.display()))?;
                info!(path = %path.display(), "Wrote report");
            }
            Ok(ExitCode::SUCCESS)
        }
        (None, None) => Err("No analysis result".to_string()),
    };

    drop(orchestrator);
    logger.shutdown().await;
    outcome
}
