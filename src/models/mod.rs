pub mod rating;
pub mod recommendation;
pub mod resource;

pub use rating::{has_ratings, Rating, ResourceId, UserId};
pub use recommendation::{Candidate, Evidence, HybridRecommendation};
pub use resource::{Filters, Resource};
