use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::core::{filter_matches, Matcher};
use crate::models::{
    ErrorResponse, FindMatchesRequest, FindMatchesResponse, HealthResponse, InvalidationResponse,
    RankRequest, RankResponse, RankedMatch, ScoreRequest, Searcher, SearcherKind,
    StoredScoresQuery, StoredScoresResponse,
};
use crate::services::{CacheKey, CacheManager, ListingStoreClient, ListingStoreError, ScoreStore, StoredScore};

/// Application state shared across all handlers
///
/// The matcher is registered separately as `web::Data<Matcher>` so the pure
/// scoring endpoints work without any backing service.
#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<ListingStoreClient>,
    pub cache: Arc<CacheManager>,
    pub scores: Arc<ScoreStore>,
    pub limits: MatchLimits,
}

/// Result-size limits for store-backed endpoints
#[derive(Debug, Clone, Copy)]
pub struct MatchLimits {
    pub default_limit: u16,
    pub max_limit: u16,
    pub candidate_pool_size: usize,
}

impl MatchLimits {
    /// Requested limit, defaulted and capped
    pub fn resolve(&self, requested: Option<u16>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1)) as usize
    }
}

impl Default for MatchLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            candidate_pool_size: 1000,
        }
    }
}

/// Ranking as kept in the cache, before filters and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedRanking {
    total_candidates: usize,
    matches: Vec<RankedMatch>,
    /// Set once the ranking has been written to the score store
    #[serde(default)]
    persisted: bool,
}

impl CachedRanking {
    fn needs_persist(&self, requested: bool) -> bool {
        requested && !self.persisted
    }
}

/// Write a ranking to the score store and drop the searcher's cached pair scores
///
/// Returns the number of rows written, or `None` when the store rejected the
/// batch.
async fn persist_ranking(state: &AppState, searcher_id: &str, matches: &[RankedMatch]) -> Option<usize> {
    let written = match state.scores.save_batch(searcher_id, matches).await {
        Ok(written) => written,
        Err(e) => {
            tracing::warn!("Failed to persist scores for {}: {}", searcher_id, e);
            return None;
        }
    };

    let pattern = CacheKey::searcher_scores(searcher_id);
    if let Err(e) = state.cache.invalidate_pattern(&pattern).await {
        tracing::warn!("Failed to invalidate score cache for {}: {}", searcher_id, e);
    }

    Some(written)
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/score", web::post().to(score_match))
        .route("/matches/rank", web::post().to(rank_candidates))
        .route("/matches/find", web::post().to(find_matches))
        .route("/matches/stored", web::get().to(get_stored_scores))
        .route("/matches/stored/{searcher_id}", web::delete().to(clear_stored_scores))
        .route("/matches/stored/{searcher_id}/{candidate_id}", web::get().to(get_stored_score))
        .route("/matches/candidates/{candidate_id}", web::delete().to(invalidate_candidate));
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::new("Validation failed", errors.to_string(), 400))
}

fn store_error(context: &str, err: &ListingStoreError) -> HttpResponse {
    match err {
        ListingStoreError::NotFound(what) => {
            HttpResponse::NotFound().json(ErrorResponse::new(context, format!("Not found: {}", what), 404))
        }
        _ => {
            tracing::error!("{}: {}", context, err);
            HttpResponse::BadGateway().json(ErrorResponse::new(context, err.to_string(), 502))
        }
    }
}

fn internal_error(context: &str, message: impl std::fmt::Display) -> HttpResponse {
    tracing::error!("{}: {}", context, message);
    HttpResponse::InternalServerError().json(ErrorResponse::new(context, message.to_string(), 500))
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let db_healthy = state.scores.health_check().await.unwrap_or(false);

    let status = if db_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        cache_entries: state.cache.l1_entry_count(),
    })
}

/// Score one candidate
///
/// POST /api/v1/matches/score
///
/// Request body:
/// ```json
/// {
///   "searcher": { "kind": "criteria", "selectedCriteria": ["budget"], "budgetMax": 200000 },
///   "candidate": { "id": "l-1", "askingPrice": 150000 }
/// }
/// ```
async fn score_match(matcher: web::Data<Matcher>, req: web::Json<ScoreRequest>) -> impl Responder {
    let result = matcher.score(&req.searcher, &req.candidate);
    HttpResponse::Ok().json(result)
}

/// Rank an inline batch of candidates
///
/// POST /api/v1/matches/rank
async fn rank_candidates(matcher: web::Data<Matcher>, req: web::Json<RankRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let req = req.into_inner();
    let limit = req.limit.map(usize::from).unwrap_or(req.candidates.len());

    let outcome = matcher.find_matches(&req.searcher, req.candidates, &req.filters, limit);

    HttpResponse::Ok().json(RankResponse {
        matches: outcome.matches,
        total_candidates: outcome.total_candidates,
    })
}

/// Fetch the searcher from the listing store, through the cache
async fn load_searcher(
    state: &AppState,
    kind: SearcherKind,
    searcher_id: &str,
) -> Result<Searcher, ListingStoreError> {
    let key = match kind {
        SearcherKind::Listing => CacheKey::listing(searcher_id),
        SearcherKind::Criteria => CacheKey::criteria(searcher_id),
    };

    match state.cache.get::<Searcher>(&key).await {
        Ok(Some(searcher)) => return Ok(searcher),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
    }

    let searcher = match kind {
        SearcherKind::Listing => {
            let mut listing = state.listings.get_listing(searcher_id).await?;
            listing.id.get_or_insert_with(|| searcher_id.to_string());
            Searcher::Listing(listing)
        }
        SearcherKind::Criteria => {
            let mut criteria = state.listings.get_criteria(searcher_id).await?;
            criteria.id.get_or_insert_with(|| searcher_id.to_string());
            Searcher::Criteria(criteria)
        }
    };

    if let Err(e) = state.cache.set(&key, &searcher).await {
        tracing::warn!("Failed to cache searcher {}: {}", key, e);
    }

    Ok(searcher)
}

/// Find matches for a stored searcher
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "searcherId": "string",
///   "searcherKind": "listing|criteria",
///   "filters": { "minScore": 50, "sector": "technology" },
///   "limit": 20,
///   "persist": true
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    matcher: web::Data<Matcher>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return validation_error(errors);
    }

    let req = req.into_inner();
    let limit = state.limits.resolve(req.limit);
    let cache_key = CacheKey::ranking(req.searcher_kind, &req.searcher_id);

    tracing::info!(
        "Finding matches for {} {}, limit: {}",
        req.searcher_kind.as_str(),
        req.searcher_id,
        limit
    );

    let cached = match state.cache.get::<CachedRanking>(&cache_key).await {
        Ok(cached) => cached,
        Err(e) => {
            tracing::warn!("Cache read failed for {}: {}", cache_key, e);
            None
        }
    };
    let from_cache = cached.is_some();

    let mut ranking = match cached {
        Some(ranking) => ranking,
        None => {
            let searcher = match load_searcher(&state, req.searcher_kind, &req.searcher_id).await {
                Ok(searcher) => searcher,
                Err(e) => return store_error("Failed to fetch searcher", &e),
            };

            let exclude = (req.searcher_kind == SearcherKind::Listing).then_some(req.searcher_id.as_str());
            let candidates = match state
                .listings
                .list_candidates(exclude, state.limits.candidate_pool_size)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => return store_error("Failed to fetch candidates", &e),
            };

            tracing::debug!("Scoring {} candidates for {}", candidates.len(), req.searcher_id);

            CachedRanking {
                total_candidates: candidates.len(),
                matches: matcher.rank_matches(&searcher, candidates),
                persisted: false,
            }
        }
    };

    // A ranking cached by a persist:false request is written by the first request asking for it
    let mut persisted = 0;
    if ranking.needs_persist(req.persist) {
        if let Some(written) = persist_ranking(&state, &req.searcher_id, &ranking.matches).await {
            persisted = written;
            ranking.persisted = true;
        }
    }

    // Cache hits keep their original TTL
    if !from_cache {
        if let Err(e) = state.cache.set(&cache_key, &ranking).await {
            tracing::warn!("Failed to cache ranking for {}: {}", req.searcher_id, e);
        }
    }

    let mut matches = filter_matches(ranking.matches, &req.filters);
    matches.truncate(limit);

    tracing::info!(
        "Returning {} matches for {} (from {} candidates, cached: {})",
        matches.len(),
        req.searcher_id,
        ranking.total_candidates,
        from_cache
    );

    HttpResponse::Ok().json(FindMatchesResponse {
        searcher_id: req.searcher_id,
        matches,
        total_candidates: ranking.total_candidates,
        cached: from_cache,
        persisted,
    })
}

/// Stored scores for a searcher, best first
///
/// GET /api/v1/matches/stored?searcherId={searcherId}&limit=20&minScore=50
async fn get_stored_scores(
    state: web::Data<AppState>,
    query: web::Query<StoredScoresQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    let limit = state.limits.resolve(query.limit);

    match state.scores.top_scores(&query.searcher_id, query.min_score, limit).await {
        Ok(scores) => HttpResponse::Ok().json(StoredScoresResponse {
            searcher_id: query.searcher_id.clone(),
            count: scores.len(),
            scores,
        }),
        Err(e) => internal_error("Failed to fetch stored scores", e),
    }
}

/// Stored score of one pair
///
/// GET /api/v1/matches/stored/{searcherId}/{candidateId}
async fn get_stored_score(state: web::Data<AppState>, path: web::Path<(String, String)>) -> impl Responder {
    let (searcher_id, candidate_id) = path.into_inner();
    let key = CacheKey::score(&searcher_id, &candidate_id);

    match state.cache.get::<StoredScore>(&key).await {
        Ok(Some(stored)) => return HttpResponse::Ok().json(stored),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
    }

    match state.scores.get_score(&searcher_id, &candidate_id).await {
        Ok(Some(stored)) => {
            if let Err(e) = state.cache.set(&key, &stored).await {
                tracing::warn!("Failed to cache score {}: {}", key, e);
            }
            HttpResponse::Ok().json(stored)
        }
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::new(
            "Score not found",
            format!("No stored score for {} -> {}", searcher_id, candidate_id),
            404,
        )),
        Err(e) => internal_error("Failed to fetch stored score", e),
    }
}

/// Forget everything computed for a searcher
///
/// DELETE /api/v1/matches/stored/{searcherId}
async fn clear_stored_scores(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let searcher_id = path.into_inner();

    let removed = match state.scores.clear_scores(&searcher_id).await {
        Ok(removed) => removed,
        Err(e) => return internal_error("Failed to clear stored scores", e),
    };

    for kind in [SearcherKind::Listing, SearcherKind::Criteria] {
        if let Err(e) = state.cache.delete(&CacheKey::ranking(kind, &searcher_id)).await {
            tracing::warn!("Failed to invalidate ranking cache for {}: {}", searcher_id, e);
        }
    }
    if let Err(e) = state
        .cache
        .invalidate_pattern(&CacheKey::searcher_scores(&searcher_id))
        .await
    {
        tracing::warn!("Failed to invalidate score cache for {}: {}", searcher_id, e);
    }

    HttpResponse::Ok().json(InvalidationResponse { removed })
}

/// Drop every result involving a listing that changed or was withdrawn
///
/// DELETE /api/v1/matches/candidates/{candidateId}
async fn invalidate_candidate(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let candidate_id = path.into_inner();

    let removed = match state.scores.delete_candidate_scores(&candidate_id).await {
        Ok(removed) => removed,
        Err(e) => return internal_error("Failed to remove candidate scores", e),
    };

    if let Err(e) = state.cache.delete(&CacheKey::listing(&candidate_id)).await {
        tracing::warn!("Failed to invalidate listing cache for {}: {}", candidate_id, e);
    }
    for pattern in [CacheKey::all_rankings(), CacheKey::all_scores()] {
        if let Err(e) = state.cache.invalidate_pattern(pattern).await {
            tracing::warn!("Failed to invalidate {}: {}", pattern, e);
        }
    }

    HttpResponse::Ok().json(InvalidationResponse { removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dimension, MatchResult};
    use actix_web::{http::StatusCode, test as actix_test, App};
    use serde_json::json;

    #[actix_web::test]
    async fn test_score_endpoint_budget_range() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(Matcher::with_default_weights()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/matches/score")
            .set_json(json!({
                "searcher": {
                    "kind": "criteria",
                    "selectedCriteria": ["budget"],
                    "budgetMin": 100000,
                    "budgetMax": 200000
                },
                "candidate": { "id": "l-1", "askingPrice": 250000 }
            }))
            .to_request();

        let result: MatchResult = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(result.score, 92.5);
        assert_eq!(result.breakdown.get(&Dimension::Budget), Some(&92.5));
    }

    #[actix_web::test]
    async fn test_rank_endpoint_excludes_self_and_filters() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(Matcher::with_default_weights()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/matches/rank")
            .set_json(json!({
                "searcher": { "kind": "listing", "id": "mine", "sector": "Technology", "askingPrice": 100000 },
                "candidates": [
                    { "id": "mine", "sector": "Technology", "askingPrice": 100000 },
                    { "id": "a", "sector": "technology", "askingPrice": 105000 },
                    { "id": "b", "sector": "Plomberie", "askingPrice": 105000 }
                ],
                "filters": { "sector": "TECHNOLOGY" }
            }))
            .to_request();

        let response: RankResponse = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(response.total_candidates, 3);
        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].listing.id.as_deref(), Some("a"));
    }

    #[actix_web::test]
    async fn test_rank_endpoint_rejects_zero_limit() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(Matcher::with_default_weights()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/matches/rank")
            .set_json(json!({
                "searcher": { "kind": "criteria" },
                "candidates": [],
                "limit": 0
            }))
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    fn ranking(persisted: bool) -> CachedRanking {
        CachedRanking {
            total_candidates: 0,
            matches: Vec::new(),
            persisted,
        }
    }

    #[test]
    fn test_cached_ranking_persisted_on_later_request() {
        // Ranked by a persist:false call, then hit by a persist:true call
        assert!(ranking(false).needs_persist(true));
        assert!(!ranking(false).needs_persist(false));
        assert!(!ranking(true).needs_persist(true));
    }

    #[test]
    fn test_cached_ranking_without_flag_is_not_persisted() {
        let cached: CachedRanking =
            serde_json::from_value(json!({ "total_candidates": 2, "matches": [] })).unwrap();
        assert!(!cached.persisted);
        assert!(cached.needs_persist(true));
    }

    #[test]
    fn test_match_limits_resolve() {
        let limits = MatchLimits::default();
        assert_eq!(limits.resolve(None), 20);
        assert_eq!(limits.resolve(Some(500)), 100);
        assert_eq!(limits.resolve(Some(0)), 1);
    }
}
