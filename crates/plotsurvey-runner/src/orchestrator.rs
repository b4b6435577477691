//! Analysis orchestrator: one authoritative result, newest polygon wins.

use crate::aggregate::{aggregate, AnalysisResult};
use crate::events::{AnalysisEvent, RequestId};
use crate::AnalysisError;
use parking_lot::Mutex;
use plotsurvey_buildings::BuildingSource;
use plotsurvey_dem::LoadReport;
use plotsurvey_geom::DrawnPolygon;
use plotsurvey_metrics::metric_defs;
use plotsurvey_surface::SurfaceSampler;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Analyzing(RequestId),
}

struct Shared {
    /// Id of the newest request; only it may commit.
    latest: u64,
    in_flight: Option<JoinHandle<()>>,
    last_result: Option<Arc<AnalysisResult>>,
    last_error: Option<Arc<AnalysisError>>,
}

struct Inner {
    buildings: Arc<dyn BuildingSource>,
    sampler: SurfaceSampler,
    events: mpsc::UnboundedSender<AnalysisEvent>,
    state: watch::Sender<AnalysisState>,
    shared: Mutex<Shared>,
}

/// Runs the building query and the surface computation for each drawn
/// polygon and keeps the newest polygon's outcome.
///
/// Drawing a polygon while another is being analyzed aborts the older task;
/// should it still finish, its outcome is compared against the newest request
/// id and discarded. A failed analysis keeps the previous result current.
///
/// Cloning yields another handle to the same orchestrator.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Create an orchestrator and the receiving end of its event stream.
    pub fn new(
        buildings: Arc<dyn BuildingSource>,
        sampler: SurfaceSampler,
    ) -> (Self, mpsc::UnboundedReceiver<AnalysisEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(AnalysisState::Idle);
        let inner = Inner {
            buildings,
            sampler,
            events,
            state,
            shared: Mutex::new(Shared {
                latest: 0,
                in_flight: None,
                last_result: None,
                last_error: None,
            }),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        )
    }

    /// Start analyzing `polygon`, superseding any analysis in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_polygon_drawn(&self, polygon: DrawnPolygon) -> RequestId {
        let mut shared = self.inner.shared.lock();
        shared.latest += 1;
        let request = RequestId(shared.latest);

        if let Some(previous) = shared.in_flight.take() {
            if !previous.is_finished() {
                previous.abort();
                metrics::counter!(metric_defs::ANALYSIS_DISCARDED.name).increment(1);
                debug!(superseded_by = %request, "Aborted in-flight analysis");
            }
        }

        metrics::counter!(metric_defs::ANALYSIS_REQUESTS.name).increment(1);
        self.inner.state.send_replace(AnalysisState::Analyzing(request));
        self.inner.emit(AnalysisEvent::Started { request });
        info!(%request, "Analyzing drawn polygon");

        let inner = Arc::clone(&self.inner);
        shared.in_flight = Some(tokio::spawn(async move {
            inner.run(request, polygon).await;
        }));
        request
    }

    pub fn state(&self) -> AnalysisState {
        *self.inner.state.borrow()
    }

    /// The newest committed result, if any.
    pub fn last_result(&self) -> Option<Arc<AnalysisResult>> {
        self.inner.shared.lock().last_result.clone()
    }

    /// The error of the newest request, if it failed.
    pub fn last_error(&self) -> Option<Arc<AnalysisError>> {
        self.inner.shared.lock().last_error.clone()
    }

    /// Wait until no analysis is in flight.
    pub async fn wait_idle(&self) {
        let mut receiver = self.inner.state.subscribe();
        // The sender lives in `inner`, which `self` keeps alive
        let _ = receiver.wait_for(|state| *state == AnalysisState::Idle).await;
    }

    /// Forward tile load failures to the event stream.
    pub fn report_tile_failures(&self, report: &LoadReport) {
        for failure in &report.failed {
            self.inner.emit(AnalysisEvent::TileLoadFailed {
                source: failure.source.clone(),
                error: failure.error.to_string(),
            });
        }
    }

    /// Emit an arbitrary event, e.g. overlay notifications.
    pub fn emit(&self, event: AnalysisEvent) {
        self.inner.emit(event);
    }
}

impl Inner {
    fn emit(&self, event: AnalysisEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }

    async fn run(&self, request: RequestId, polygon: DrawnPolygon) {
        let started = Instant::now();
        let flat_area = polygon.flat_area_sq_meters();

        let sampler = self.sampler.clone();
        let surface_polygon = polygon.clone();
        let surface = tokio::task::spawn_blocking(move || sampler.compute(&surface_polygon));

        // A panic in the source arrives as a JoinError. Dropping the set
        // aborts the query.
        let mut query = JoinSet::new();
        let source = Arc::clone(&self.buildings);
        let query_polygon = polygon.clone();
        query.spawn(async move { source.find_buildings(&query_polygon).await });

        let (buildings, surface) = tokio::join!(query.join_next(), surface);

        let outcome = match (buildings, surface) {
            (None, _) => Err(AnalysisError::Task("building query was not started".to_string())),
            (Some(Err(join_error)), _) => Err(AnalysisError::Task(join_error.to_string())),
            (Some(Ok(Err(error))), _) => Err(AnalysisError::Query(error)),
            (_, Err(join_error)) => Err(AnalysisError::Task(join_error.to_string())),
            (_, Ok(Err(error))) => Err(AnalysisError::Surface(error)),
            (Some(Ok(Ok(buildings))), Ok(Ok(surface))) => Ok(aggregate(buildings, flat_area, surface)),
        };

        self.commit(request, outcome, started);
    }

    /// Apply an outcome if `request` is still the newest; otherwise drop it.
    fn commit(&self, request: RequestId, outcome: Result<AnalysisResult, AnalysisError>, started: Instant) {
        let mut shared = self.shared.lock();
        if shared.latest != request.0 {
            metrics::counter!(metric_defs::ANALYSIS_DISCARDED.name).increment(1);
            debug!(%request, latest = shared.latest, "Discarding stale analysis result");
            return;
        }

        shared.in_flight = None;
        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                metrics::counter!(metric_defs::ANALYSIS_COMPLETED.name).increment(1);
                metrics::histogram!(metric_defs::ANALYSIS_DURATION.name)
                    .record(started.elapsed().as_secs_f64());
                info!(
                    %request,
                    buildings = result.building_count,
                    flat_area_sq_m = result.flat_area_sq_meters,
                    terrain_area_sq_m = result.terrain_area_sq_meters,
                    "Analysis complete"
                );
                shared.last_result = Some(Arc::clone(&result));
                shared.last_error = None;
                self.emit(AnalysisEvent::Completed { request, result });
            }
            Err(error) => {
                let error = Arc::new(error);
                metrics::counter!(metric_defs::ANALYSIS_FAILED.name, "error" => error.kind())
                    .increment(1);
                warn!(%request, error = %error, "Analysis failed; keeping previous result");
                shared.last_error = Some(Arc::clone(&error));
                self.emit(AnalysisEvent::Failed { request, error });
            }
        }
        self.state.send_replace(AnalysisState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plotsurvey_buildings::{BuildingFeature, BuildingSet, QueryError};
    use plotsurvey_dem::ElevationStore;
    use plotsurvey_geom::{BoundingBox, Reprojector};
    use plotsurvey_surface::{SurfaceConfig, SurfaceReport};

    struct NoBuildings;

    #[async_trait]
    impl BuildingSource for NoBuildings {
        async fn fetch(&self, _bbox: &BoundingBox) -> Result<Vec<BuildingFeature>, QueryError> {
            Ok(Vec::new())
        }
    }

    fn orchestrator() -> (Orchestrator, mpsc::UnboundedReceiver<AnalysisEvent>) {
        let sampler = SurfaceSampler::new(
            Arc::new(ElevationStore::new()),
            Reprojector::new("utm zone=31").unwrap(),
            SurfaceConfig::default(),
        );
        Orchestrator::new(Arc::new(NoBuildings), sampler)
    }

    fn result_with_area(flat_area: f64) -> AnalysisResult {
        aggregate(BuildingSet::default(), flat_area, SurfaceReport::default())
    }

    #[test]
    fn test_stale_commit_is_discarded() {
        let (orchestrator, mut events) = orchestrator();
        let inner = &orchestrator.inner;
        inner.shared.lock().latest = 2;

        inner.commit(RequestId(1), Ok(result_with_area(10.0)), Instant::now());
        assert!(orchestrator.last_result().is_none());
        assert!(events.try_recv().is_err());

        inner.commit(
            RequestId(1),
            Err(AnalysisError::Task("late".to_string())),
            Instant::now(),
        );
        assert!(orchestrator.last_error().is_none());
        assert!(events.try_recv().is_err());

        inner.commit(RequestId(2), Ok(result_with_area(20.0)), Instant::now());
        assert_eq!(orchestrator.last_result().unwrap().flat_area_sq_meters, 20.0);
        assert!(matches!(
            events.try_recv(),
            Ok(AnalysisEvent::Completed { request: RequestId(2), .. })
        ));

        // A straggler after the newest commit changes nothing either
        inner.commit(RequestId(1), Ok(result_with_area(30.0)), Instant::now());
        assert_eq!(orchestrator.last_result().unwrap().flat_area_sq_meters, 20.0);
        assert!(events.try_recv().is_err());
        assert_eq!(orchestrator.state(), AnalysisState::Idle);
    }
}
