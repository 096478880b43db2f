use thiserror::Error;

/// Failure to load a route resource
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to read route resource {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("route resource is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("route resource is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unknown route format: {0}")]
    UnknownFormat(String),

    #[error("route resource contains no usable samples")]
    Empty,
}

pub type RouteResult<T> = Result<T, RouteError>;
