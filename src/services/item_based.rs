use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::EngineResult,
    models::{Candidate, Evidence, Rating, Resource, ResourceId, UserId},
    services::{
        predictor::{
            rank_candidates, rated_resources, Predictor, PredictorConfig, PredictorKind,
            ScoreAccumulator,
        },
        similarity::{build_similarity_matrix, ItemAxis, SimilarityIndex, SimilarityMatrix},
    },
    telemetry::{TelemetrySink, TracingSink},
};

/// Recommends resources similar to ones the learner already rated
pub struct ItemBasedPredictor {
    config: PredictorConfig,
    sink: Arc<dyn TelemetrySink>,
}

impl Default for ItemBasedPredictor {
    fn default() -> Self {
        Self {
            config: PredictorConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }
}

impl ItemBasedPredictor {
    pub fn new(config: PredictorConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sink: Arc::new(TracingSink),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Scores unrated resources against an item similarity matrix
    ///
    /// Each rated resource projects the learner's rating of it onto its
    /// sufficiently similar, unrated neighbours.
    pub fn score(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        items: &SimilarityMatrix<ResourceId>,
        catalog: &[Resource],
    ) -> EngineResult<Vec<Candidate>> {
        let rated = rated_resources(user_id, ratings);
        if rated.is_empty() {
            return Ok(Vec::new());
        }

        let mut accumulators: HashMap<&ResourceId, ScoreAccumulator<ResourceId>> = HashMap::new();
        for own in ratings.iter().filter(|r| &r.user_id == user_id) {
            for (similar, similarity) in items.neighbors(&own.resource_id) {
                if similarity <= self.config.similarity_threshold || rated.contains(similar) {
                    continue;
                }
                accumulators.entry(similar).or_default().add(
                    own.rating,
                    similarity,
                    own.resource_id.clone(),
                );
            }
        }

        tracing::debug!(
            user_id = %user_id,
            rated = rated.len(),
            candidates = accumulators.len(),
            "Similar resources collected"
        );

        Ok(rank_candidates(
            accumulators,
            catalog,
            self.config.max_recommendations,
            Evidence::SimilarResources,
        ))
    }
}

impl Predictor for ItemBasedPredictor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::ItemBased
    }

    fn config(&self) -> &PredictorConfig {
        &self.config
    }

    fn sink(&self) -> &dyn TelemetrySink {
        self.sink.as_ref()
    }

    fn try_predict(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
    ) -> EngineResult<Vec<Candidate>> {
        let items = build_similarity_matrix::<ItemAxis>(ratings)?;
        self.score(user_id, ratings, &items, catalog)
    }

    fn predict_with_index(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
        index: &SimilarityIndex,
    ) -> EngineResult<Vec<Candidate>> {
        self.score(user_id, ratings, &index.items, catalog)
    }
}
