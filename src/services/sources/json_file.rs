use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::DataSource;
use crate::{
    error::EngineResult,
    models::{Rating, Resource},
};

/// Reads ratings and catalog from two JSON array files
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    ratings_path: PathBuf,
    catalog_path: PathBuf,
}

impl JsonFileSource {
    pub fn new(ratings_path: impl Into<PathBuf>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            ratings_path: ratings_path.into(),
            catalog_path: catalog_path.into(),
        }
    }

    pub fn ratings_path(&self) -> &Path {
        &self.ratings_path
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }
}

async fn read_json_array<T: DeserializeOwned>(path: &Path) -> EngineResult<Vec<T>> {
    let start = Instant::now();

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Failed to read data file");
        e
    })?;
    let records: Vec<T> = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Failed to parse data file");
        e
    })?;

    tracing::info!(
        path = %path.display(),
        records = records.len(),
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Loaded data file"
    );

    Ok(records)
}

#[async_trait::async_trait]
impl DataSource for JsonFileSource {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn load_ratings(&self) -> EngineResult<Vec<Rating>> {
        read_json_array(&self.ratings_path).await
    }

    async fn load_catalog(&self) -> EngineResult<Vec<Resource>> {
        read_json_array(&self.catalog_path).await
    }
}
