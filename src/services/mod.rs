pub mod batch;
pub mod hybrid;
pub mod item_based;
pub mod predictor;
pub mod similarity;
pub mod sources;
pub mod user_based;

pub use batch::{recommend_batch, BatchReport, BatchStatus, UserRecommendations};
pub use hybrid::{blend, HybridConfig, HybridRecommender};
pub use item_based::ItemBasedPredictor;
pub use predictor::{Predictor, PredictorConfig, PredictorKind};
pub use similarity::{
    build_similarity_matrix, Axis, ItemAxis, SimilarityIndex, SimilarityMatrix, UserAxis,
};
pub use sources::{DataSource, JsonFileSource};
pub use user_based::UserBasedPredictor;
