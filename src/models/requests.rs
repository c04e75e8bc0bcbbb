use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{ListingRecord, MatchFilters, Searcher, SearcherKind};

/// Score one candidate against an inline searcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub searcher: Searcher,
    pub candidate: ListingRecord,
}

/// Rank an inline batch of candidates
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    pub searcher: Searcher,
    #[validate(length(max = 5000))]
    pub candidates: Vec<ListingRecord>,
    #[serde(default)]
    pub filters: MatchFilters,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u16>,
}

/// Find matches for a searcher stored in the listing store
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FindMatchesRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "searcher_id")]
    pub searcher_id: String,
    #[serde(default, alias = "searcher_kind")]
    pub searcher_kind: SearcherKind,
    #[serde(default)]
    pub filters: MatchFilters,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u16>,
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_persist() -> bool {
    true
}

/// Query parameters for stored score retrieval
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StoredScoresQuery {
    #[validate(length(min = 1))]
    pub searcher_id: String,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u16>,
    pub min_score: Option<f64>,
}
