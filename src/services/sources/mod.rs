//! Ratings and catalog sources
//!
//! The engine itself is synchronous and takes plain slices. Sources sit in
//! front of it and do the I/O, so the same batch runner works against files
//! today and anything else that can hand back the two collections.

use crate::{
    error::EngineResult,
    models::{Rating, Resource},
};

pub mod json_file;

pub use json_file::JsonFileSource;

#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    async fn load_ratings(&self) -> EngineResult<Vec<Rating>>;

    async fn load_catalog(&self) -> EngineResult<Vec<Resource>>;
}
