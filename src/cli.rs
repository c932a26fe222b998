use clap::Parser;

use crate::models::{Filters, UserId};

/// Batch recommendations for one or more learners
#[derive(Debug, Clone, Parser)]
#[command(name = "resource-recommender")]
#[command(about = "Recommend learning resources from collaborative ratings")]
#[command(version)]
pub struct CliArgs {
    /// Learners to recommend for
    #[arg(required = true, value_name = "USER_ID")]
    pub user_ids: Vec<String>,

    /// Only keep resources whose attribute equals the value (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,
}

impl CliArgs {
    pub fn users(&self) -> Vec<UserId> {
        self.user_ids.iter().map(UserId::new).collect()
    }

    pub fn filter_set(&self) -> Filters {
        let mut filters = Filters::new();
        for (key, value) in &self.filters {
            filters.insert(key, value);
        }
        filters
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("filter '{}' must look like key=value", raw)),
    }
}
