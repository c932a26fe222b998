use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Display;

use crate::{
    error::{EngineError, EngineResult},
    models::{has_ratings, Candidate, Evidence, Rating, Resource, ResourceId, UserId},
    services::similarity::SimilarityIndex,
    telemetry::{scoring_span, TelemetrySink},
};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 10;

/// Identifies which predictor produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorKind {
    UserBased,
    ItemBased,
    Hybrid,
}

impl Display for PredictorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictorKind::UserBased => write!(f, "user_based"),
            PredictorKind::ItemBased => write!(f, "item_based"),
            PredictorKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Configuration shared by the user-based and item-based predictors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Neighbours must be strictly more similar than this to contribute
    pub similarity_threshold: f64,
    pub max_recommendations: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> EngineResult<()> {
        validate_threshold(self.similarity_threshold)
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> EngineResult<()> {
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        return Err(EngineError::InvalidConfig(format!(
            "similarity_threshold must lie in [-1, 1] (got {})",
            threshold
        )));
    }
    Ok(())
}

/// A collaborative-filtering predictor
///
/// Implementors provide the fallible scoring paths; `predict` wraps them in
/// the public contract: never fail, report no-data and failures to the
/// sink, and never return a resource the user already rated.
pub trait Predictor: Send + Sync {
    fn kind(&self) -> PredictorKind;

    fn config(&self) -> &PredictorConfig;

    fn sink(&self) -> &dyn TelemetrySink;

    /// Scores candidates, building the similarity matrix it needs
    fn try_predict(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
    ) -> EngineResult<Vec<Candidate>>;

    /// Scores candidates against a prebuilt index of the same ratings
    fn predict_with_index(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
        index: &SimilarityIndex,
    ) -> EngineResult<Vec<Candidate>>;

    /// Scores candidates, degrading to an empty list on any error
    fn predict(
        &self,
        user_id: &UserId,
        ratings: &[Rating],
        catalog: &[Resource],
    ) -> Vec<Candidate> {
        let _span = scoring_span(self.kind(), user_id).entered();

        if catalog.is_empty() || !has_ratings(user_id, ratings) {
            self.sink().no_data(self.kind(), user_id);
            return Vec::new();
        }

        match self.try_predict(user_id, ratings, catalog) {
            Ok(candidates) => {
                self.sink().completed(self.kind(), user_id, candidates.len());
                candidates
            }
            Err(e) => {
                self.sink().computation_failed(self.kind(), user_id, &e);
                Vec::new()
            }
        }
    }
}

/// Resources the user has rated
pub(crate) fn rated_resources<'a>(
    user_id: &UserId,
    ratings: &'a [Rating],
) -> HashSet<&'a ResourceId> {
    ratings
        .iter()
        .filter(|r| &r.user_id == user_id)
        .map(|r| &r.resource_id)
        .collect()
}

/// Running similarity-weighted sum for one candidate resource
#[derive(Debug)]
pub(crate) struct ScoreAccumulator<E> {
    score: f64,
    weight: f64,
    contributors: BTreeSet<E>,
}

impl<E> Default for ScoreAccumulator<E> {
    fn default() -> Self {
        Self {
            score: 0.0,
            weight: 0.0,
            contributors: BTreeSet::new(),
        }
    }
}

impl<E: Ord> ScoreAccumulator<E> {
    pub(crate) fn add(&mut self, rating: f64, similarity: f64, contributor: E) {
        self.score += rating * similarity;
        self.weight += similarity;
        self.contributors.insert(contributor);
    }
}

/// Turns accumulators into ranked candidates
///
/// Scores are weighted averages (`score / weight`). Resources with zero
/// weight, or missing from the catalog, are dropped. Output is sorted by
/// score descending (ties by resource id) and cut to `limit`.
pub(crate) fn rank_candidates<E: Ord>(
    accumulators: HashMap<&ResourceId, ScoreAccumulator<E>>,
    catalog: &[Resource],
    limit: usize,
    evidence: fn(Vec<E>) -> Evidence,
) -> Vec<Candidate> {
    let catalog = catalog_index(catalog);

    let mut candidates: Vec<Candidate> = accumulators
        .into_iter()
        .filter(|(_, acc)| acc.weight != 0.0)
        .filter_map(|(resource_id, acc)| {
            let Some(resource) = catalog.get(resource_id) else {
                tracing::debug!(
                    resource_id = %resource_id,
                    "Scored resource missing from catalog, skipping"
                );
                return None;
            };
            let score = acc.score / acc.weight;
            Some(Candidate::new(
                (*resource).clone(),
                score,
                evidence(acc.contributors.into_iter().collect()),
            ))
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.resource.id.cmp(&b.resource.id))
    });
    candidates.truncate(limit);
    candidates
}

/// Catalog lookup by id; the first record for a duplicated id wins
pub(crate) fn catalog_index(catalog: &[Resource]) -> HashMap<&ResourceId, &Resource> {
    let mut index = HashMap::with_capacity(catalog.len());
    for resource in catalog {
        index.entry(&resource.id).or_insert(resource);
    }
    index
}
