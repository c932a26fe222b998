use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resource_recommender::{
    cli::CliArgs,
    services::{recommend_batch, DataSource, JsonFileSource},
    Config, HybridRecommender,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout is reserved for the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let args = CliArgs::parse();

    let recommender = HybridRecommender::new(config.hybrid_config())
        .context("Invalid recommender configuration")?;

    let source = JsonFileSource::new(&config.ratings_path, &config.catalog_path);
    let (ratings, catalog) = tokio::try_join!(source.load_ratings(), source.load_catalog())
        .with_context(|| {
            format!(
                "Failed to load data via {} ({}, {})",
                source.name(),
                source.ratings_path().display(),
                source.catalog_path().display()
            )
        })?;

    tracing::info!(
        ratings = ratings.len(),
        resources = catalog.len(),
        users = args.user_ids.len(),
        filters = args.filters.len(),
        "Starting recommendation run"
    );

    let report = recommend_batch(
        Arc::new(recommender),
        Arc::new(ratings),
        Arc::new(catalog),
        args.users(),
        Arc::new(args.filter_set()),
        config.deadline(),
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
