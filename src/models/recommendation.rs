use serde::{Deserialize, Serialize};

use super::{Resource, ResourceId, UserId};

/// Which entities supported a predictor's score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ids")]
pub enum Evidence {
    /// Neighbouring learners whose ratings contributed
    SimilarUsers(Vec<UserId>),
    /// Resources the learner rated that contributed
    SimilarResources(Vec<ResourceId>),
}

impl Evidence {
    pub fn len(&self) -> usize {
        match self {
            Evidence::SimilarUsers(ids) => ids.len(),
            Evidence::SimilarResources(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An unrated resource scored by a single predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub resource: Resource,
    pub score: f64,
    /// `score` with two decimals, for display
    pub score_display: String,
    pub evidence: Evidence,
}

impl Candidate {
    pub fn new(resource: Resource, score: f64, evidence: Evidence) -> Self {
        Self {
            resource,
            score,
            score_display: format!("{:.2}", score),
            evidence,
        }
    }
}

/// A blended recommendation as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridRecommendation {
    pub resource: Resource,
    /// User-based score multiplied by the user weight (0 if absent)
    pub user_based_score: f64,
    /// Item-based score multiplied by the item weight (0 if absent)
    pub item_based_score: f64,
    pub total_score: f64,
}
