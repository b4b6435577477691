//! Metric declarations for the plotsurvey analysis pipeline.
//!
//! Every metric is a const [`Metric`] in [`metric_defs`], so call sites share
//! one name and one description. Recording goes through the `metrics` facade
//! (re-exported here); without an installed recorder it is a no-op.
//!
//! ```rust
//! use plotsurvey_metrics::metric_defs;
//!
//! metrics::counter!(metric_defs::ANALYSIS_REQUESTS.name).increment(1);
//! metrics::histogram!(metric_defs::SURFACE_SAMPLES.name).record(42.0);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration: name, kind, description, unit and label keys.
///
/// ```rust
/// use plotsurvey_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const TILES: Metric = Metric::gauge("plotsurvey.example.tiles")
///     .with_description("Tiles in memory")
///     .with_unit(Unit::Count);
///
/// assert_eq!(TILES.kind, MetricKind::Gauge);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description)
            }
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// All metrics recorded by the pipeline.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Analysis lifecycle
    // ========================================================================

    /// Polygons submitted for analysis.
    pub const ANALYSIS_REQUESTS: Metric = Metric::counter("plotsurvey.analysis.requests")
        .with_description("Polygons submitted for analysis")
        .with_unit(Unit::Count);

    /// Analyses whose result became the current result.
    pub const ANALYSIS_COMPLETED: Metric = Metric::counter("plotsurvey.analysis.completed")
        .with_description("Analyses committed as the current result")
        .with_unit(Unit::Count);

    /// Analyses that ended in a building query error.
    ///
    /// Labels: error (http, status, decode)
    pub const ANALYSIS_FAILED: Metric = Metric::counter("plotsurvey.analysis.failed")
        .with_description("Analyses that failed with a building query error")
        .with_unit(Unit::Count)
        .with_labels(&["error"]);

    /// Analyses superseded by a newer polygon before they could commit.
    pub const ANALYSIS_DISCARDED: Metric = Metric::counter("plotsurvey.analysis.discarded")
        .with_description("Stale analyses discarded after a newer polygon was drawn")
        .with_unit(Unit::Count);

    /// Wall time from polygon drawn to result committed.
    pub const ANALYSIS_DURATION: Metric = Metric::histogram("plotsurvey.analysis.duration")
        .with_description("Time from polygon drawn to result committed")
        .with_unit(Unit::Seconds);

    // ========================================================================
    // Building query
    // ========================================================================

    /// Features returned by the query service, before the intersection filter.
    pub const BUILDINGS_RETURNED: Metric = Metric::histogram("plotsurvey.buildings.returned")
        .with_description("Features returned by the building query before filtering")
        .with_unit(Unit::Count);

    /// Features kept by the intersection filter.
    pub const BUILDINGS_KEPT: Metric = Metric::histogram("plotsurvey.buildings.kept")
        .with_description("Features intersecting the drawn polygon")
        .with_unit(Unit::Count);

    pub const BUILDING_QUERY_DURATION: Metric =
        Metric::histogram("plotsurvey.buildings.query_duration")
            .with_description("Building query round-trip time")
            .with_unit(Unit::Seconds);

    // ========================================================================
    // Surface
    // ========================================================================

    /// Valid 3D samples per surface computation.
    pub const SURFACE_SAMPLES: Metric = Metric::histogram("plotsurvey.surface.samples")
        .with_description("Samples with a defined elevation per surface computation")
        .with_unit(Unit::Count);

    /// Triangles summed per surface computation.
    pub const SURFACE_TRIANGLES: Metric = Metric::histogram("plotsurvey.surface.triangles")
        .with_description("Triangles in the surface mesh")
        .with_unit(Unit::Count);

    // ========================================================================
    // Elevation tiles
    // ========================================================================

    pub const DEM_TILES_LOADED: Metric = Metric::gauge("plotsurvey.dem.tiles_loaded")
        .with_description("Elevation tiles in the active set")
        .with_unit(Unit::Count);

    pub const DEM_TILE_FAILURES: Metric = Metric::counter("plotsurvey.dem.tile_failures")
        .with_description("Elevation tiles excluded after a fetch or decode failure")
        .with_unit(Unit::Count);

    /// Every metric above, for [`describe_metrics`](super::describe_metrics).
    pub const ALL: &[&Metric] = &[
        &ANALYSIS_REQUESTS,
        &ANALYSIS_COMPLETED,
        &ANALYSIS_FAILED,
        &ANALYSIS_DISCARDED,
        &ANALYSIS_DURATION,
        &BUILDINGS_RETURNED,
        &BUILDINGS_KEPT,
        &BUILDING_QUERY_DURATION,
        &SURFACE_SAMPLES,
        &SURFACE_TRIANGLES,
        &DEM_TILES_LOADED,
        &DEM_TILE_FAILURES,
    ];
}

/// Register descriptions for every metric in [`metric_defs::ALL`].
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Install a Prometheus exporter serving `/metrics` on `port`.
///
/// Must be called from within a tokio runtime.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    port: u16,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;
    describe_metrics();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::ANALYSIS_REQUESTS.name, "plotsurvey.analysis.requests");
        assert_eq!(metric_defs::ANALYSIS_REQUESTS.kind, MetricKind::Counter);
        assert_eq!(metric_defs::ANALYSIS_DURATION.unit, Some(Unit::Seconds));
        assert_eq!(metric_defs::ANALYSIS_FAILED.labels, &["error"]);
        assert_eq!(metric_defs::DEM_TILES_LOADED.kind, MetricKind::Gauge);
    }

    #[test]
    fn test_all_names_unique_and_prefixed() {
        let mut names = HashSet::new();
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("plotsurvey."), "{}", metric.name);
            assert!(!metric.description.is_empty(), "{} has no description", metric.name);
            assert!(names.insert(metric.name), "duplicate metric {}", metric.name);
        }
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn test_builder() {
        const TEST_HISTOGRAM: Metric = Metric::histogram("test.histogram")
            .with_description("A test histogram")
            .with_unit(Unit::Milliseconds)
            .with_labels(&["stage"]);

        assert_eq!(TEST_HISTOGRAM.kind.to_string(), "histogram");
        assert_eq!(TEST_HISTOGRAM.description, "A test histogram");
        assert_eq!(TEST_HISTOGRAM.labels, &["stage"]);
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing must be a harmless no-op
        describe_metrics();
    }
}
