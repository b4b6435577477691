use thiserror::Error;

/// Building query failures. All are recoverable: the caller reports them and
/// keeps whatever result it already has.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Building query request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Building query returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Building query response is not valid Overpass JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl QueryError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Http(_) => "http",
            QueryError::Status { .. } => "status",
            QueryError::Decode(_) => "decode",
        }
    }
}
