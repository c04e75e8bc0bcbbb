use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::SearcherKind;

/// Keys fetched per SCAN round trip when invalidating by pattern
const SCAN_BATCH: usize = 200;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("In-memory invalidation failed: {0}")]
    InvalidationError(String),
}

/// Two-tier cache for rankings and listings
///
/// L1 is an in-process moka cache, L2 is Redis shared by every instance.
/// Both tiers hold JSON so a value written by one instance can be read by
/// another. A miss is `Ok(None)`; only transport and decoding problems are
/// errors.
pub struct CacheManager {
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, Arc<str>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Connect to Redis and build the in-memory tier
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .support_invalidation_closures()
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache,
            ttl_secs,
        })
    }

    /// Look a value up, L1 first, then L2 (promoting L2 hits into L1)
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        if let Some(json) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(Some(serde_json::from_str(&json)?));
        }

        let value: Option<String> = {
            let mut conn = self.redis.lock().await;
            redis::cmd("GET").arg(key).query_async(&mut *conn).await?
        };

        match value {
            Some(json) => {
                tracing::trace!("L2 cache hit: {}", key);
                let decoded = serde_json::from_str(&json)?;
                self.l1_cache.insert(key.to_string(), Arc::from(json)).await;
                Ok(Some(decoded))
            }
            None => {
                tracing::trace!("Cache miss: {}", key);
                Ok(None)
            }
        }
    }

    /// Store a value in both tiers with the configured TTL
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        {
            let mut conn = self.redis.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(&json)
                .query_async(&mut *conn)
                .await?;
        }

        self.l1_cache.insert(key.to_string(), Arc::from(json)).await;

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        let mut conn = self.redis.lock().await;
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut *conn).await?;
        Ok(())
    }

    /// Invalidate every entry whose key matches a trailing-`*` glob
    ///
    /// Redis keys are walked with SCAN so large keyspaces do not block the
    /// server. Returns the number of Redis keys removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let prefix = pattern.trim_end_matches('*').to_string();
        self.l1_cache
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
            .map_err(|e| CacheError::InvalidationError(e.to_string()))?;

        let mut conn = self.redis.lock().await;
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = redis::cmd("DEL").arg(&keys).query_async(&mut *conn).await?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!("Invalidated {} keys matching {}", removed, pattern);
        Ok(removed)
    }

    /// Number of entries currently held in the in-memory tier
    pub fn l1_entry_count(&self) -> u64 {
        self.l1_cache.entry_count()
    }
}

/// Cache key builder
///
/// Ids are percent-encoded so they never carry the `:` separator or Redis
/// glob metacharacters into a key or an invalidation pattern.
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a full ranking of a stored searcher
    pub fn ranking(kind: SearcherKind, searcher_id: &str) -> String {
        format!("ranking:{}:{}", kind.as_str(), urlencoding::encode(searcher_id))
    }

    /// Pattern matching every cached ranking
    pub fn all_rankings() -> &'static str {
        "ranking:*"
    }

    /// Build a cache key for a listing
    pub fn listing(listing_id: &str) -> String {
        format!("listing:{}", urlencoding::encode(listing_id))
    }

    /// Build a cache key for saved search criteria
    pub fn criteria(criteria_id: &str) -> String {
        format!("criteria:{}", urlencoding::encode(criteria_id))
    }

    /// Build a cache key for a single (searcher, candidate) score
    pub fn score(searcher_id: &str, candidate_id: &str) -> String {
        format!(
            "score:{}:{}",
            urlencoding::encode(searcher_id),
            urlencoding::encode(candidate_id)
        )
    }

    /// Pattern matching every cached score of one searcher
    pub fn searcher_scores(searcher_id: &str) -> String {
        format!("score:{}:*", urlencoding::encode(searcher_id))
    }

    /// Pattern matching every cached single-pair score
    pub fn all_scores() -> &'static str {
        "score:*"
    }
}
