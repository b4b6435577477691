//! Events emitted towards the map view.

use crate::{AnalysisError, AnalysisResult};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Monotonically increasing id of an analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notifications for the presentation layer.
///
/// `Completed` and `Failed` are only ever sent for the newest request; a
/// superseded request ends silently.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// Analysis of a newly drawn polygon began.
    Started { request: RequestId },
    /// The request's result is now the current result.
    Completed {
        request: RequestId,
        result: Arc<AnalysisResult>,
    },
    /// The request failed; the previous result, if any, stays current.
    Failed {
        request: RequestId,
        error: Arc<AnalysisError>,
    },
    /// An elevation tile was left out of the active set.
    TileLoadFailed { source: String, error: String },
    /// A static overlay is ready to display.
    OverlayLoaded {
        source: String,
        features: Arc<geojson::FeatureCollection>,
    },
    /// A static overlay could not be loaded.
    OverlayFailed { source: String, error: String },
}

/// Log one event at the level it deserves.
pub fn log_event(event: &AnalysisEvent) {
    match event {
        AnalysisEvent::Started { request } => info!(%request, "Started"),
        AnalysisEvent::Completed { request, result } => {
            info!(%request, buildings = result.building_count, "Completed")
        }
        AnalysisEvent::Failed { request, error } => warn!(%request, %error, "Failed"),
        AnalysisEvent::TileLoadFailed { source, error } => {
            warn!(tile = %source, %error, "Elevation tile unavailable")
        }
        AnalysisEvent::OverlayLoaded { source, features } => {
            info!(overlay = %source, features = features.features.len(), "Overlay ready")
        }
        AnalysisEvent::OverlayFailed { source, error } => {
            warn!(overlay = %source, %error, "Overlay unavailable")
        }
    }
}

/// Background task that logs every event from an orchestrator.
pub struct EventLogger {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<usize>,
}

impl EventLogger {
    /// Must be called from within a tokio runtime.
    pub fn spawn(mut events: mpsc::UnboundedReceiver<AnalysisEvent>) -> Self {
        let (stop, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut logged = 0;
            loop {
                tokio::select! {
                    biased;
                    event = events.recv() => match event {
                        Some(event) => {
                            log_event(&event);
                            logged += 1;
                        }
                        None => return logged,
                    },
                    _ = &mut stop_rx => {
                        while let Ok(event) = events.try_recv() {
                            log_event(&event);
                            logged += 1;
                        }
                        return logged;
                    }
                }
            }
        });
        Self { stop, handle }
    }

    /// Log whatever is still queued, then stop. Returns the number of events
    /// logged over the logger's lifetime.
    pub async fn shutdown(self) -> usize {
        let _ = self.stop.send(());
        self.handle.await.unwrap_or(0)
    }
}
