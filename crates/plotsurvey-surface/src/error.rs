use thiserror::Error;

/// Errors from surface sampling.
///
/// Insufficient elevation coverage is not an error: it yields a zero area.
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Invalid surface configuration: {0}")]
    InvalidConfig(String),

    #[error("Sampling grid of {points} points exceeds the limit of {limit}")]
    GridTooLarge { points: u64, limit: u64 },

    #[error(transparent)]
    Geometry(#[from] plotsurvey_geom::GeomError),
}
