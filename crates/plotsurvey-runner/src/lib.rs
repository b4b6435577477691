//! # plotsurvey-runner
//!
//! Polygon analysis for a map view: for each drawn polygon, count the
//! buildings inside it and compute its flat and terrain-aware areas.
//!
//! - [`AnalysisConfig`]: YAML configuration
//! - [`session::start`]: load elevation tiles and build an [`Orchestrator`]
//! - [`Orchestrator::on_polygon_drawn`]: the single entry point per drawn
//!   polygon; results and errors arrive as [`AnalysisEvent`]s
//!
//! Building query and surface computation run concurrently. Only the newest
//! polygon's outcome is ever committed or emitted.

pub mod aggregate;
pub mod config;
pub mod events;
pub mod orchestrator;
pub mod overlay;
pub mod session;

pub use aggregate::{aggregate, AnalysisReport, AnalysisResult};
pub use config::{AnalysisConfig, ConfigError, ElevationConfig};
pub use events::{log_event, AnalysisEvent, EventLogger, RequestId};
pub use orchestrator::{AnalysisState, Orchestrator};
pub use overlay::{load_overlay, OverlayError, OverlaySource};
pub use session::Session;

use plotsurvey_buildings::QueryError;
use plotsurvey_surface::SurfaceError;
use thiserror::Error;

/// Why an analysis (or starting one) failed.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Surface computation failed: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Analysis task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Query(e) => e.kind(),
            AnalysisError::Surface(_) => "surface",
            AnalysisError::Task(_) => "task",
            AnalysisError::Config(_) => "config",
        }
    }
}
