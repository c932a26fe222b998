use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::{EngineError, EngineResult},
    models::{
        has_ratings, Candidate, Filters, HybridRecommendation, Rating, Resource, ResourceId, UserId,
    },
    services::{
        item_based::ItemBasedPredictor,
        predictor::{
            validate_threshold, Predictor, PredictorConfig, PredictorKind,
            DEFAULT_MAX_RECOMMENDATIONS, DEFAULT_SIMILARITY_THRESHOLD,
        },
        similarity::SimilarityIndex,
        user_based::UserBasedPredictor,
    },
    telemetry::{scoring_span, TelemetrySink, TracingSink},
};

/// How many candidates each inner predictor keeps, per final slot
pub const DEFAULT_CANDIDATE_POOL_FACTOR: usize = 2;

/// Hybrid recommender configuration
///
/// Weights are applied as given and never normalized, so they need not sum
/// to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    pub user_weight: f64,
    pub item_weight: f64,
    pub max_recommendations: usize,
    /// Passed to both inner predictors
    pub similarity_threshold: f64,
    /// Inner predictors return up to `max_recommendations * candidate_pool_factor`
    /// candidates before blending. Larger values trade speed for fewer
    /// resources lost to the early cut.
    pub candidate_pool_factor: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            user_weight: 0.5,
            item_weight: 0.5,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            candidate_pool_factor: DEFAULT_CANDIDATE_POOL_FACTOR,
        }
    }
}

impl HybridConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.user_weight.is_finite() || !self.item_weight.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "weights must be finite (user_weight = {}, item_weight = {})",
                self.user_weight, self.item_weight
            )));
        }
        if self.candidate_pool_factor == 0 {
            return Err(EngineError::InvalidConfig(
                "candidate_pool_factor must be at least 1".to_string(),
            ));
        }
        validate_threshold(self.similarity_threshold)
    }

    /// Configuration handed to each inner predictor
    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            similarity_threshold: self.similarity_threshold,
            max_recommendations: self
                .max_recommendations
                .saturating_mul(self.candidate_pool_factor),
        }
    }
}

/// Blends user-based and item-based predictions
///
/// Each call is one synchronous pass: build the similarity index, run both
/// predictors, blend by weight, filter, rank. Any failure empties the whole
/// result; a blend from only one predictor is never returned.
pub struct HybridRecommender {
    config: HybridConfig,
    user_based: UserBasedPredictor,
    item_based: ItemBasedPredictor,
    sink: Arc<dyn TelemetrySink>,
}

impl HybridRecommender {
    pub fn new(config: HybridConfig) -> EngineResult<Self> {
        config.validate()?;
        let predictor_config = config.predictor_config();

        Ok(Self {
            config,
            user_based: UserBasedPredictor::new(predictor_config)?,
            item_based: ItemBasedPredictor::new(predictor_config)?,
            sink: Arc::new(TracingSink),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.user_based = self.user_based.with_sink(Arc::clone(&sink));
        self.item_based = self.item_based.with_sink(Arc::clone(&sink));
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn user_based(&self) -> &UserBasedPredictor {
        &self.user_based
    }

    pub fn item_based(&self) -> &ItemBasedPredictor {
        &self.item_based
    }

    /// Generates recommendations for one learner
    ///
    /// Never fails: no data and computation errors both yield an empty list
    /// and are reported to the sink.
    pub fn recommend(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
        filters: &Filters,
    ) -> Vec<HybridRecommendation> {
        let _span = scoring_span(PredictorKind::Hybrid, user_id).entered();

        if !self.has_data(user_id, ratings, catalog) {
            return Vec::new();
        }

        let result = SimilarityIndex::build(ratings)
            .and_then(|index| self.try_recommend(user_id, ratings, catalog, filters, &index));
        self.finish(user_id, result)
    }

    /// Like [`recommend`](Self::recommend), reusing an index built from the
    /// same `ratings`
    pub fn recommend_with_index(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
        filters: &Filters,
        index: &SimilarityIndex,
    ) -> Vec<HybridRecommendation> {
        let _span = scoring_span(PredictorKind::Hybrid, user_id).entered();

        if !self.has_data(user_id, ratings, catalog) {
            return Vec::new();
        }

        let result = self.try_recommend(user_id, ratings, catalog, filters, index);
        self.finish(user_id, result)
    }

    fn has_data(&self, user_id: &UserId, ratings: &[Rating], catalog: &[Resource]) -> bool {
        if catalog.is_empty() || !has_ratings(user_id, ratings) {
            self.sink.no_data(PredictorKind::Hybrid, user_id);
            return false;
        }
        true
    }

    fn finish(
        &self,
        user_id: &UserId,
        result: EngineResult<Vec<HybridRecommendation>>,
    ) -> Vec<HybridRecommendation> {
        match result {
            Ok(recommendations) => {
                self.sink
                    .completed(PredictorKind::Hybrid, user_id, recommendations.len());
                recommendations
            }
            Err(e) => {
                self.sink
                    .computation_failed(PredictorKind::Hybrid, user_id, &e);
                Vec::new()
            }
        }
    }

    fn try_recommend(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
        filters: &Filters,
        index: &SimilarityIndex,
    ) -> EngineResult<Vec<HybridRecommendation>> {
        let user_candidates = self
            .user_based
            .predict_with_index(user_id, ratings, catalog, index)?;
        let item_candidates = self
            .item_based
            .predict_with_index(user_id, ratings, catalog, index)?;

        let mut recommendations = blend(
            &user_candidates,
            &item_candidates,
            self.config.user_weight,
            self.config.item_weight,
        );
        let blended = recommendations.len();

        recommendations.retain(|r| filters.matches(&r.resource));
        rank(&mut recommendations);
        recommendations.truncate(self.config.max_recommendations);

        tracing::debug!(
            user_id = %user_id,
            user_candidates = user_candidates.len(),
            item_candidates = item_candidates.len(),
            blended,
            returned = recommendations.len(),
            "Hybrid blend complete"
        );

        Ok(recommendations)
    }
}

/// Merges both predictors' candidates by resource id
///
/// A resource absent from one predictor contributes 0 from that side.
pub fn blend(
    user_candidates: &[Candidate],
    item_candidates: &[Candidate],
    user_weight: f64,
    item_weight: f64,
) -> Vec<HybridRecommendation> {
    let mut merged: HashMap<&ResourceId, HybridRecommendation> = HashMap::new();

    for candidate in user_candidates {
        entry_for(&mut merged, candidate).user_based_score += candidate.score * user_weight;
    }
    for candidate in item_candidates {
        entry_for(&mut merged, candidate).item_based_score += candidate.score * item_weight;
    }

    merged
        .into_values()
        .map(|mut recommendation| {
            recommendation.total_score =
                recommendation.user_based_score + recommendation.item_based_score;
            recommendation
        })
        .collect()
}

fn entry_for<'m, 'c>(
    merged: &'m mut HashMap<&'c ResourceId, HybridRecommendation>,
    candidate: &'c Candidate,
) -> &'m mut HybridRecommendation {
    merged
        .entry(&candidate.resource.id)
        .or_insert_with(|| HybridRecommendation {
            resource: candidate.resource.clone(),
            user_based_score: 0.0,
            item_based_score: 0.0,
            total_score: 0.0,
        })
}

/// Total score descending, ties by resource id
fn rank(recommendations: &mut [HybridRecommendation]) {
    recommendations.sort_by(|a, b| {
        b.total_score
            .total_cmp(&a.total_score)
            .then_with(|| a.resource.id.cmp(&b.resource.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Evidence;
    use crate::telemetry::MockTelemetrySink;

    const EPSILON: f64 = 1e-9;

    fn candidate(id: &str, score: f64) -> Candidate {
        Candidate::new(Resource::new(id), score, Evidence::SimilarUsers(vec![]))
    }

    fn scenario_ratings() -> Vec<Rating> {
        vec![
            Rating::new("u1", "r1", 5.0),
            Rating::new("u1", "r2", 4.0),
            Rating::new("u2", "r1", 4.0),
            Rating::new("u2", "r2", 5.0),
            Rating::new("u2", "r3", 4.0),
        ]
    }

    fn scenario_catalog() -> Vec<Resource> {
        vec![
            Resource::new("r1").with_attribute("subject", "Math"),
            Resource::new("r2").with_attribute("subject", "Math"),
            Resource::new("r3").with_attribute("subject", "Science"),
        ]
    }

    fn recommender(config: HybridConfig) -> HybridRecommender {
        HybridRecommender::new(config).unwrap()
    }

    fn permissive() -> HybridConfig {
        HybridConfig {
            similarity_threshold: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_blend_applies_weights() {
        let blended = blend(&[candidate("x", 0.8)], &[candidate("x", 0.5)], 0.6, 0.4);

        assert_eq!(blended.len(), 1);
        let x = &blended[0];
        assert!((x.user_based_score - 0.48).abs() < EPSILON);
        assert!((x.item_based_score - 0.2).abs() < EPSILON);
        assert!((x.total_score - 0.68).abs() < EPSILON);
    }

    #[test]
    fn test_blend_missing_side_contributes_zero() {
        let mut blended = blend(
            &[candidate("only-user", 4.0)],
            &[candidate("only-item", 3.0)],
            0.5,
            0.5,
        );
        rank(&mut blended);

        assert_eq!(blended.len(), 2);
        assert_eq!(blended[0].resource.id.as_str(), "only-user");
        assert_eq!(blended[0].item_based_score, 0.0);
        assert!((blended[0].total_score - 2.0).abs() < EPSILON);
        assert_eq!(blended[1].user_based_score, 0.0);
        assert!((blended[1].total_score - 1.5).abs() < EPSILON);
    }

    #[test]
    fn test_weights_are_not_normalized() {
        let blended = blend(&[candidate("x", 3.0)], &[candidate("x", 1.0)], 2.0, 0.0);
        assert!((blended[0].total_score - 6.0).abs() < EPSILON);
    }

    #[test]
    fn test_recommend_blends_both_predictors() {
        let recommendations = recommender(permissive()).recommend(
            &UserId::new("u1"),
            &scenario_ratings(),
            &scenario_catalog(),
            &Filters::new(),
        );

        // user-based scores r3 at 4.0, item-based at 4.5
        assert_eq!(recommendations.len(), 1);
        let r3 = &recommendations[0];
        assert_eq!(r3.resource.id.as_str(), "r3");
        assert!((r3.user_based_score - 2.0).abs() < EPSILON);
        assert!((r3.item_based_score - 2.25).abs() < EPSILON);
        assert!((r3.total_score - 4.25).abs() < EPSILON);
    }

    #[test]
    fn test_filters_apply_after_blending() {
        let recommender = recommender(permissive());
        let user = UserId::new("u1");

        let science = recommender.recommend(
            &user,
            &scenario_ratings(),
            &scenario_catalog(),
            &Filters::new().with("subject", "Science"),
        );
        assert_eq!(science.len(), 1);

        let math = recommender.recommend(
            &user,
            &scenario_ratings(),
            &scenario_catalog(),
            &Filters::new().with("subject", "Math"),
        );
        assert!(math.is_empty());
    }

    #[test]
    fn test_predictor_config_uses_pool_factor() {
        let config = HybridConfig {
            max_recommendations: 7,
            candidate_pool_factor: 3,
            ..Default::default()
        };
        let recommender = recommender(config);
        assert_eq!(recommender.config().candidate_pool_factor, 3);
        assert_eq!(recommender.user_based().config().max_recommendations, 21);
        assert_eq!(recommender.item_based().config().max_recommendations, 21);

        let default = HybridRecommender::new(HybridConfig::default()).unwrap();
        assert_eq!(default.user_based().config().max_recommendations, 20);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let bad_weight = HybridConfig {
            user_weight: f64::NAN,
            ..Default::default()
        };
        assert!(HybridRecommender::new(bad_weight).is_err());

        let bad_factor = HybridConfig {
            candidate_pool_factor: 0,
            ..Default::default()
        };
        assert!(HybridRecommender::new(bad_factor).is_err());

        let bad_threshold = HybridConfig {
            similarity_threshold: 2.0,
            ..Default::default()
        };
        let err = HybridRecommender::new(bad_threshold).err().unwrap();
        assert_eq!(err.kind(), "invalid_config");
    }

    #[test]
    fn test_failure_is_reported_once_and_empties_result() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_computation_failed()
            .withf(|kind, user, error| {
                *kind == PredictorKind::Hybrid
                    && user.as_str() == "u1"
                    && error.kind() == "malformed_rating"
            })
            .times(1)
            .return_const(());

        let mut ratings = scenario_ratings();
        ratings.push(Rating::new("u3", "r3", f64::NAN));

        let recommender = recommender(permissive()).with_sink(Arc::new(sink));
        let recommendations = recommender.recommend(
            &UserId::new("u1"),
            &ratings,
            &scenario_catalog(),
            &Filters::new(),
        );
        assert!(recommendations.is_empty());
    }

    #[test]
    fn test_no_data_is_reported_under_hybrid() {
        let mut sink = MockTelemetrySink::new();
        sink.expect_no_data()
            .withf(|kind, _| *kind == PredictorKind::Hybrid)
            .times(3)
            .return_const(());

        let recommender = recommender(permissive()).with_sink(Arc::new(sink));
        let user = UserId::new("u1");
        assert!(recommender
            .recommend(&user, &[], &scenario_catalog(), &Filters::new())
            .is_empty());
        assert!(recommender
            .recommend(&user, &scenario_ratings(), &[], &Filters::new())
            .is_empty());
        assert!(recommender
            .recommend(
                &UserId::new("stranger"),
                &scenario_ratings(),
                &scenario_catalog(),
                &Filters::new()
            )
            .is_empty());
    }

    #[test]
    fn test_recommend_with_index_matches_recommend() {
        let recommender = recommender(permissive());
        let ratings = scenario_ratings();
        let catalog = scenario_catalog();
        let user = UserId::new("u1");
        let index = SimilarityIndex::build(&ratings).unwrap();

        assert_eq!(
            recommender.recommend_with_index(&user, &ratings, &catalog, &Filters::new(), &index),
            recommender.recommend(&user, &ratings, &catalog, &Filters::new())
        );
    }
}
