use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::{
    error::{EngineError, EngineResult},
    models::{Filters, HybridRecommendation, Rating, Resource, UserId},
    services::{hybrid::HybridRecommender, similarity::SimilarityIndex},
};

/// Outcome for one learner in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Ok,
    NoRecommendations,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecommendations {
    pub user_id: UserId,
    pub status: BatchStatus,
    pub recommendations: Vec<HybridRecommendation>,
}

impl UserRecommendations {
    fn empty(user_id: UserId, status: BatchStatus) -> Self {
        Self {
            user_id,
            status,
            recommendations: Vec::new(),
        }
    }
}

/// Recommendations for every requested learner, in request order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<UserRecommendations>,
}

impl BatchReport {
    fn new(results: Vec<UserRecommendations>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            results,
        }
    }

    pub fn count(&self, status: BatchStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Scores many learners against one rating set
///
/// The similarity index is built once on the blocking pool and shared. Each
/// learner is then scored on its own blocking task and bounded by `deadline`.
/// A learner that misses the deadline is reported as timed out and its
/// result is discarded when the task eventually finishes.
pub async fn recommend_batch(
    recommender: Arc<HybridRecommender>,
    ratings: Arc<Vec<Rating>>,
    catalog: Arc<Vec<Resource>>,
    user_ids: Vec<UserId>,
    filters: Arc<Filters>,
    deadline: Duration,
) -> BatchReport {
    let run_start = Instant::now();

    let index = match build_index(Arc::clone(&ratings)).await {
        Ok(index) => Arc::new(index),
        Err(e) => {
            tracing::error!(
                error_kind = e.kind(),
                error = %e,
                users = user_ids.len(),
                "Similarity index build failed, failing batch"
            );
            let results = user_ids
                .into_iter()
                .map(|user_id| UserRecommendations::empty(user_id, BatchStatus::Failed))
                .collect();
            return BatchReport::new(results);
        }
    };

    let mut tasks = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        let recommender = Arc::clone(&recommender);
        let ratings = Arc::clone(&ratings);
        let catalog = Arc::clone(&catalog);
        let filters = Arc::clone(&filters);
        let index = Arc::clone(&index);
        let task_user = user_id.clone();

        let task = tokio::spawn(async move {
            let scoring = tokio::task::spawn_blocking(move || {
                recommender.recommend_with_index(&task_user, &ratings, &catalog, &filters, &index)
            });
            tokio::time::timeout(deadline, scoring).await
        });
        tasks.push((user_id, task));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for (user_id, task) in tasks {
        let result = match task.await {
            Ok(Ok(Ok(recommendations))) if recommendations.is_empty() => {
                UserRecommendations::empty(user_id, BatchStatus::NoRecommendations)
            }
            Ok(Ok(Ok(recommendations))) => UserRecommendations {
                user_id,
                status: BatchStatus::Ok,
                recommendations,
            },
            Ok(Err(_elapsed)) => {
                tracing::warn!(
                    user_id = %user_id,
                    deadline_ms = deadline.as_millis() as u64,
                    "Recommendation deadline exceeded, discarding result"
                );
                UserRecommendations::empty(user_id, BatchStatus::TimedOut)
            }
            Ok(Ok(Err(e))) | Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Scoring task failed");
                UserRecommendations::empty(user_id, BatchStatus::Failed)
            }
        };
        results.push(result);
    }

    let report = BatchReport::new(results);

    let timed_out = report.count(BatchStatus::TimedOut);
    let failed = report.count(BatchStatus::Failed);
    if timed_out + failed > 0 {
        tracing::warn!(
            run_id = %report.run_id,
            timed_out,
            failed,
            "Partial batch failure"
        );
    }

    tracing::info!(
        run_id = %report.run_id,
        users = report.results.len(),
        ok = report.count(BatchStatus::Ok),
        processing_time_ms = run_start.elapsed().as_millis() as u64,
        "Batch recommendations complete"
    );

    report
}

async fn build_index(ratings: Arc<Vec<Rating>>) -> EngineResult<SimilarityIndex> {
    tokio::task::spawn_blocking(move || SimilarityIndex::build(&ratings))
        .await
        .map_err(|e| EngineError::Internal(format!("index build task failed: {}", e)))?
}
