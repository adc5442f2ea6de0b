use thiserror::Error;

/// Errors raised while buffering geometries or synthesising patterns.
#[derive(Debug, Error)]
pub enum GranularityError {
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("invalid feature: {0}")]
    InvalidFeature(String),

    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("buffering {kind} by {distance_km} km produced no area")]
    EmptyBuffer { kind: &'static str, distance_km: f64 },

    #[error("invalid colour '{0}'")]
    InvalidColour(String),

    #[error("pattern size must be positive, got {0}")]
    InvalidPatternSize(u32),

    #[error("drawing surface error: {0}")]
    Surface(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GranularityError>;
