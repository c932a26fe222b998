/// Engine-level errors
///
/// Only internal helpers (matrix building, data loading) return these. The
/// public scoring entry points convert them into empty results and report
/// them through the telemetry sink.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Malformed rating for user '{user_id}' on resource '{resource_id}': {reason}")]
    MalformedRating {
        user_id: String,
        resource_id: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable label for structured telemetry
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::MalformedRating { .. } => "malformed_rating",
            EngineError::InvalidConfig(_) => "invalid_config",
            EngineError::Io(_) => "io",
            EngineError::Json(_) => "json",
            EngineError::Internal(_) => "internal",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
