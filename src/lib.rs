//! Collaborative-filtering recommendations for learning resources.
//!
//! Learners rate resources; the engine finds similar learners and similar
//! resources by cosine similarity and blends both views into a ranked list
//! of resources the learner has not rated yet.
//!
//! The scoring core ([`services::similarity`], [`services::user_based`],
//! [`services::item_based`], [`services::hybrid`]) is synchronous and does no
//! I/O. Loading data and fanning work out across learners live in
//! [`services::sources`] and [`services::batch`].

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use models::{
    Candidate, Evidence, Filters, HybridRecommendation, Rating, Resource, ResourceId, UserId,
};
pub use services::{
    HybridConfig, HybridRecommender, ItemBasedPredictor, Predictor, PredictorConfig,
    PredictorKind, SimilarityIndex, UserBasedPredictor,
};
pub use telemetry::{TelemetrySink, TracingSink};
