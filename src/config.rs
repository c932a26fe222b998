use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::{
    hybrid::{HybridConfig, DEFAULT_CANDIDATE_POOL_FACTOR},
    predictor::{DEFAULT_MAX_RECOMMENDATIONS, DEFAULT_SIMILARITY_THRESHOLD},
};

/// Prefix for every environment variable read by [`Config`]
pub const ENV_PREFIX: &str = "RECOMMENDER_";

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// JSON array of ratings
    #[serde(default = "default_ratings_path")]
    pub ratings_path: PathBuf,

    /// JSON array of catalog resources
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,

    #[serde(default = "default_weight")]
    pub user_weight: f64,

    #[serde(default = "default_weight")]
    pub item_weight: f64,

    #[serde(default = "default_candidate_pool_factor")]
    pub candidate_pool_factor: usize,

    /// Per-learner deadline for batch runs, in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

fn default_ratings_path() -> PathBuf {
    PathBuf::from("data/ratings.json")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/catalog.json")
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_max_recommendations() -> usize {
    DEFAULT_MAX_RECOMMENDATIONS
}

fn default_weight() -> f64 {
    0.5
}

fn default_candidate_pool_factor() -> usize {
    DEFAULT_CANDIDATE_POOL_FACTOR
}

fn default_deadline_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn hybrid_config(&self) -> HybridConfig {
        HybridConfig {
            user_weight: self.user_weight,
            item_weight: self.item_weight,
            max_recommendations: self.max_recommendations,
            similarity_threshold: self.similarity_threshold,
            candidate_pool_factor: self.candidate_pool_factor,
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}
