//! Session startup: tile and overlay failures surface as events.

use plotsurvey_dem::TileSource;
use plotsurvey_runner::{session, AnalysisConfig, AnalysisEvent, OverlaySource};
use std::path::PathBuf;
use std::time::Duration;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("plotsurvey-{}-{name}", std::process::id()))
}

#[tokio::test]
async fn test_missing_tile_is_reported_not_fatal() {
    let config = AnalysisConfig::default();
    let extra = vec![TileSource::path("/nonexistent/dem/USGS_13_n35w119.tif")];

    let mut session = session::start(&config, extra).await.unwrap();

    assert!(session.load_report.loaded.is_empty());
    assert_eq!(session.load_report.failed.len(), 1);
    match session.events.try_recv().unwrap() {
        AnalysisEvent::TileLoadFailed { source, .. } => {
            assert!(source.contains("USGS_13_n35w119"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_overlays_load_in_background() {
    let good = temp_path("stations.geojson");
    std::fs::write(
        &good,
        r#"{"type": "FeatureCollection", "features": [
             {"type": "Feature", "properties": {"name": "Station 27"},
              "geometry": {"type": "Point", "coordinates": [-118.33, 34.10]}}]}"#,
    )
    .unwrap();

    let config = AnalysisConfig {
        overlays: vec![
            OverlaySource::Path(good.clone()),
            OverlaySource::Path(temp_path("missing.geojson")),
        ],
        ..AnalysisConfig::default()
    };
    let mut session = session::start(&config, Vec::new()).await.unwrap();

    let mut loaded = 0;
    let mut failed = 0;
    while loaded + failed < 2 {
        let event = tokio::time::timeout(Duration::from_secs(5), session.events.recv())
            .await
            .expect("overlay events arrive")
            .expect("channel open");
        match event {
            AnalysisEvent::OverlayLoaded { features, .. } => {
                assert_eq!(features.features.len(), 1);
                loaded += 1;
            }
            AnalysisEvent::OverlayFailed { source, .. } => {
                assert!(source.ends_with("missing.geojson"));
                failed += 1;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!((loaded, failed), (1, 1));

    let _ = std::fs::remove_file(good);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = AnalysisConfig {
        projection: "definitely_not_an_operator".to_string(),
        ..AnalysisConfig::default()
    };
    assert!(session::start(&config, Vec::new()).await.is_err());
}
