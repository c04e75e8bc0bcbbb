use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Dimension, MatchResult, RankedMatch};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A persisted match result, keyed by (searcher, candidate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScore {
    pub id: Uuid,
    pub searcher_id: String,
    pub candidate_id: String,
    pub score: f64,
    pub breakdown: BTreeMap<Dimension, f64>,
    pub explanation: Vec<String>,
    pub criteria_matched_count: u32,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

impl StoredScore {
    /// Snapshot a fresh result for persistence
    pub fn from_result(searcher_id: &str, candidate_id: &str, result: &MatchResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            searcher_id: searcher_id.to_string(),
            candidate_id: candidate_id.to_string(),
            score: result.score,
            breakdown: result.breakdown.clone(),
            explanation: result.explanation.clone(),
            criteria_matched_count: result.criteria_matched_count,
            computed_at: chrono::Utc::now(),
        }
    }

    /// Rebuild the engine result, for callers that skip recomputation
    pub fn to_result(&self) -> MatchResult {
        MatchResult {
            score: self.score,
            breakdown: self.breakdown.clone(),
            explanation: self.explanation.clone(),
            criteria_matched_count: self.criteria_matched_count,
        }
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let breakdown: Json<BTreeMap<Dimension, f64>> = row.try_get("breakdown")?;
        let matched: i32 = row.try_get("criteria_matched_count")?;

        Ok(Self {
            id: row.try_get("id")?,
            searcher_id: row.try_get("searcher_id")?,
            candidate_id: row.try_get("candidate_id")?,
            score: row.try_get("score")?,
            breakdown: breakdown.0,
            explanation: row.try_get("explanation")?,
            criteria_matched_count: matched.max(0) as u32,
            computed_at: row.try_get("computed_at")?,
        })
    }
}

const UPSERT_SCORE: &str = r#"
    INSERT INTO match_scores
        (id, searcher_id, candidate_id, score, breakdown, explanation, criteria_matched_count, computed_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (searcher_id, candidate_id)
    DO UPDATE SET
        score = EXCLUDED.score,
        breakdown = EXCLUDED.breakdown,
        explanation = EXCLUDED.explanation,
        criteria_matched_count = EXCLUDED.criteria_matched_count,
        computed_at = EXCLUDED.computed_at
"#;

/// PostgreSQL store for computed match scores
///
/// Keeps the last result for every (searcher, candidate) pair so rankings can
/// be served and sorted later without recomputation.
pub struct ScoreStore {
    pool: PgPool,
}

impl ScoreStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL score store");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Persist one result, replacing any previous score for the pair
    pub async fn save_result(
        &self,
        searcher_id: &str,
        candidate_id: &str,
        result: &MatchResult,
    ) -> Result<StoredScore, PostgresError> {
        if searcher_id.is_empty() || candidate_id.is_empty() {
            return Err(PostgresError::InvalidInput("searcher and candidate ids are required".into()));
        }

        let stored = StoredScore::from_result(searcher_id, candidate_id, result);
        bind_upsert(&stored).execute(&self.pool).await?;

        tracing::debug!(
            "Stored score {} for {} -> {}",
            stored.score,
            searcher_id,
            candidate_id
        );

        Ok(stored)
    }

    /// Persist a whole ranking in one transaction
    ///
    /// Candidates without an id cannot be keyed and are skipped. Returns the
    /// number of rows written.
    pub async fn save_batch(&self, searcher_id: &str, ranked: &[RankedMatch]) -> Result<usize, PostgresError> {
        if searcher_id.is_empty() {
            return Err(PostgresError::InvalidInput("searcher id is required".into()));
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for ranked_match in ranked {
            let Some(candidate_id) = ranked_match.listing.id.as_deref() else {
                continue;
            };
            let stored = StoredScore::from_result(searcher_id, candidate_id, &ranked_match.result);
            bind_upsert(&stored).execute(&mut *tx).await?;
            written += 1;
        }

        tx.commit().await?;

        tracing::debug!("Stored {} scores for searcher {}", written, searcher_id);

        Ok(written)
    }

    /// Fetch the stored score of one pair
    pub async fn get_score(
        &self,
        searcher_id: &str,
        candidate_id: &str,
    ) -> Result<Option<StoredScore>, PostgresError> {
        let query = r#"
            SELECT id, searcher_id, candidate_id, score, breakdown, explanation,
                   criteria_matched_count, computed_at
            FROM match_scores
            WHERE searcher_id = $1 AND candidate_id = $2
        "#;

        let row = sqlx::query(query)
            .bind(searcher_id)
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(StoredScore::from_row).transpose()?)
    }

    /// Best stored scores of a searcher, highest first
    pub async fn top_scores(
        &self,
        searcher_id: &str,
        min_score: Option<f64>,
        limit: usize,
    ) -> Result<Vec<StoredScore>, PostgresError> {
        let query = r#"
            SELECT id, searcher_id, candidate_id, score, breakdown, explanation,
                   criteria_matched_count, computed_at
            FROM match_scores
            WHERE searcher_id = $1 AND score >= $2
            ORDER BY score DESC, computed_at DESC
            LIMIT $3
        "#;

        let rows = sqlx::query(query)
            .bind(searcher_id)
            .bind(min_score.unwrap_or(0.0))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let scores = rows
            .iter()
            .map(StoredScore::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} stored scores for {}", scores.len(), searcher_id);

        Ok(scores)
    }

    /// Drop every stored score of a searcher
    pub async fn clear_scores(&self, searcher_id: &str) -> Result<u64, PostgresError> {
        let result = sqlx::query("DELETE FROM match_scores WHERE searcher_id = $1")
            .bind(searcher_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            "Cleared {} stored scores for searcher {}",
            result.rows_affected(),
            searcher_id
        );

        Ok(result.rows_affected())
    }

    /// Drop every stored score involving a candidate (e.g. after the listing changed)
    pub async fn delete_candidate_scores(&self, candidate_id: &str) -> Result<u64, PostgresError> {
        let result = sqlx::query("DELETE FROM match_scores WHERE candidate_id = $1")
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            "Removed {} stored scores for candidate {}",
            result.rows_affected(),
            candidate_id
        );

        Ok(result.rows_affected())
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn bind_upsert(
    stored: &StoredScore,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(UPSERT_SCORE)
        .bind(stored.id)
        .bind(&stored.searcher_id)
        .bind(&stored.candidate_id)
        .bind(stored.score)
        .bind(Json(&stored.breakdown))
        .bind(&stored.explanation)
        .bind(stored.criteria_matched_count as i32)
        .bind(stored.computed_at)
}
