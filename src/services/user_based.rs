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
        similarity::{build_similarity_matrix, SimilarityIndex, SimilarityMatrix, UserAxis},
    },
    telemetry::{TelemetrySink, TracingSink},
};

/// Recommends what similar learners rated
///
/// Every other learner whose similarity to the target exceeds the threshold
/// projects their ratings onto resources the target has not rated. A
/// resource's score is the similarity-weighted average of those ratings.
pub struct UserBasedPredictor {
    config: PredictorConfig,
    sink: Arc<dyn TelemetrySink>,
}

impl Default for UserBasedPredictor {
    fn default() -> Self {
        Self {
            config: PredictorConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }
}

impl UserBasedPredictor {
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

    /// Scores unrated resources against a user similarity matrix
    pub fn score(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        users: &SimilarityMatrix<UserId>,
        catalog: &[Resource],
    ) -> EngineResult<Vec<Candidate>> {
        let rated = rated_resources(user_id, ratings);
        if rated.is_empty() {
            return Ok(Vec::new());
        }

        let neighbors: HashMap<&UserId, f64> = users
            .neighbors(user_id)
            .filter(|(_, similarity)| *similarity > self.config.similarity_threshold)
            .collect();

        tracing::debug!(
            user_id = %user_id,
            neighbors = neighbors.len(),
            "Similar users selected"
        );

        let mut accumulators: HashMap<&ResourceId, ScoreAccumulator<UserId>> = HashMap::new();
        for rating in ratings {
            let Some(&similarity) = neighbors.get(&rating.user_id) else {
                continue;
            };
            if rated.contains(&rating.resource_id) {
                continue;
            }
            accumulators.entry(&rating.resource_id).or_default().add(
                rating.rating,
                similarity,
                rating.user_id.clone(),
            );
        }

        Ok(rank_candidates(
            accumulators,
            catalog,
            self.config.max_recommendations,
            Evidence::SimilarUsers,
        ))
    }
}

impl Predictor for UserBasedPredictor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::UserBased
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
        let users = build_similarity_matrix::<UserAxis>(ratings)?;
        self.score(user_id, ratings, &users, catalog)
    }

    fn predict_with_index(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
        index: &SimilarityIndex,
    ) -> EngineResult<Vec<Candidate>> {
        self.score(user_id, ratings, &index.users, catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MockTelemetrySink;

    fn scenario_ratings() -> Vec<Rating> {
        vec![
            Rating::new("u1", "r1", 5.0),
            Rating::new("u1", "r2", 4.0),
            Rating::new("u2", "r1", 4.0),
            Rating::new("u2", "r2", 5.0),
            Rating::new("u2", "r3", 4.0),
        ]
    }

    fn catalog(ids: &[&str]) -> Vec<Resource> {
        ids.iter().map(|id| Resource::new(*id)).collect()
    }

    fn predictor(threshold: f64, max: usize) -> UserBasedPredictor {
        UserBasedPredictor::new(PredictorConfig {
            similarity_threshold: threshold,
            max_recommendations: max,
        })
        .unwrap()
    }

    #[test]
    fn test_recommends_what_similar_user_rated() {
        let predictor = predictor(0.0, 10);
        let candidates = predictor.predict(
            &UserId::new("u1"),
            &scenario_ratings(),
            &catalog(&["r1", "r2", "r3"]),
        );

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].resource.id, ResourceId::new("r3"));
        // Single neighbour: weighted average collapses to their rating
        assert!((candidates[0].score - 4.0).abs() < 1e-9);
        assert_eq!(candidates[0].score_display, "4.00");
        assert_eq!(
            candidates[0].evidence,
            Evidence::SimilarUsers(vec![UserId::new("u2")])
        );
    }

    #[test]
    fn test_weighted_average_over_neighbors() {
        // t ~ a (sim 1.0), t ~ b (sim ~0.71 over r1, r2)
        let ratings = vec![
            Rating::new("t", "r1", 1.0),
            Rating::new("t", "r2", 1.0),
            Rating::new("a", "r1", 2.0),
            Rating::new("a", "r2", 2.0),
            Rating::new("a", "x", 5.0),
            Rating::new("b", "r1", 4.0),
            Rating::new("b", "r2", 0.0),
            Rating::new("b", "x", 1.0),
        ];
        let users = build_similarity_matrix::<UserAxis>(&ratings).unwrap();
        let sim_a = users.get(&UserId::new("t"), &UserId::new("a")).unwrap();
        let sim_b = users.get(&UserId::new("t"), &UserId::new("b")).unwrap();

        let candidates = predictor(0.3, 10)
            .try_predict(&UserId::new("t"), &ratings, &catalog(&["r1", "r2", "x"]))
            .unwrap();

        let expected = (5.0 * sim_a + 1.0 * sim_b) / (sim_a + sim_b);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_neighbors_below_threshold_are_excluded() {
        // a and t disagree strongly: similarity ~0.2 over r1, r2
        let ratings = vec![
            Rating::new("t", "r1", 5.0),
            Rating::new("t", "r2", 0.5),
            Rating::new("a", "r1", 0.5),
            Rating::new("a", "r2", 5.0),
            Rating::new("a", "x", 5.0),
        ];
        let target = UserId::new("t");
        let items = catalog(&["r1", "r2", "x"]);

        assert!(predictor(0.3, 10)
            .try_predict(&target, &ratings, &items)
            .unwrap()
            .is_empty());
        assert_eq!(
            predictor(0.1, 10)
                .try_predict(&target, &ratings, &items)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_never_recommends_rated_resources_and_respects_limit() {
        let mut ratings = scenario_ratings();
        for extra in ["r4", "r5", "r6"] {
            ratings.push(Rating::new("u2", extra, 3.0));
        }
        let items = catalog(&["r1", "r2", "r3", "r4", "r5", "r6"]);

        let candidates = predictor(0.0, 2).predict(&UserId::new("u1"), &ratings, &items);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].resource.id, ResourceId::new("r3"));
        assert!(candidates
            .iter()
            .all(|c| c.resource.id.as_str() != "r1" && c.resource.id.as_str() != "r2"));
        assert!(candidates[0].score >= candidates[1].score);
    }

    #[test]
    fn test_resources_outside_catalog_are_dropped() {
        let candidates = predictor(0.0, 10).predict(
            &UserId::new("u1"),
            &scenario_ratings(),
            &catalog(&["r1", "r2"]),
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_unknown_user_reports_no_data() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_no_data()
            .withf(|kind, user| *kind == PredictorKind::UserBased && user.as_str() == "ghost")
            .times(1)
            .return_const(());

        let predictor = predictor(0.3, 10).with_sink(Arc::new(sink));
        let candidates =
            predictor.predict(&UserId::new("ghost"), &scenario_ratings(), &catalog(&["r1"]));
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_empty_inputs_report_no_data() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_no_data().times(2).return_const(());

        let predictor = UserBasedPredictor::default().with_sink(Arc::new(sink));
        assert!(predictor
            .predict(&UserId::new("u1"), &[], &catalog(&["r1"]))
            .is_empty());
        assert!(predictor
            .predict(&UserId::new("u1"), &scenario_ratings(), &[])
            .is_empty());
    }

    #[test]
    fn test_malformed_ratings_are_reported_not_raised() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_computation_failed()
            .withf(|kind, user, error| {
                *kind == PredictorKind::UserBased
                    && user.as_str() == "u1"
                    && error.kind() == "malformed_rating"
            })
            .times(1)
            .return_const(());

        let mut ratings = scenario_ratings();
        ratings.push(Rating::new("u3", "r1", f64::INFINITY));

        let predictor = predictor(0.0, 10).with_sink(Arc::new(sink));
        let candidates = predictor.predict(&UserId::new("u1"), &ratings, &catalog(&["r3"]));
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_completed_event_carries_count() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_completed()
            .withf(|kind, _, count| *kind == PredictorKind::UserBased && *count == 1)
            .times(1)
            .return_const(());

        let predictor = predictor(0.0, 10).with_sink(Arc::new(sink));
        predictor.predict(
            &UserId::new("u1"),
            &scenario_ratings(),
            &catalog(&["r1", "r2", "r3"]),
        );
    }
}
