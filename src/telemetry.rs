use crate::{error::EngineError, models::UserId, services::predictor::PredictorKind};

/// Receives engine events
///
/// Injected at construction so callers (and tests) decide where events go.
/// The default, [`TracingSink`], forwards everything to `tracing`.
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySink: Send + Sync {
    /// The user has no ratings, or there is nothing to score against
    fn no_data(&self, predictor: PredictorKind, user_id: &UserId);

    /// Scoring failed and was converted to an empty result
    fn computation_failed(&self, predictor: PredictorKind, user_id: &UserId, error: &EngineError);

    /// Scoring finished with `count` results
    fn completed(&self, predictor: PredictorKind, user_id: &UserId, count: usize);
}

/// Sink that emits structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn no_data(&self, predictor: PredictorKind, user_id: &UserId) {
        tracing::info!(
            predictor = %predictor,
            user_id = %user_id,
            "No ratings available, returning empty recommendations"
        );
    }

    fn computation_failed(&self, predictor: PredictorKind, user_id: &UserId, error: &EngineError) {
        tracing::error!(
            predictor = %predictor,
            user_id = %user_id,
            error_kind = error.kind(),
            error = %error,
            "Recommendation computation failed"
        );
    }

    fn completed(&self, predictor: PredictorKind, user_id: &UserId, count: usize) {
        tracing::debug!(
            predictor = %predictor,
            user_id = %user_id,
            count,
            "Recommendations computed"
        );
    }
}

/// Span wrapping one scoring run
pub fn scoring_span(predictor: PredictorKind, user_id: &UserId) -> tracing::Span {
    tracing::info_span!(
        "scoring",
        predictor = %predictor,
        user_id = %user_id,
    )
}
