// Model exports
pub mod domain;
pub mod lenient;
pub mod requests;
pub mod responses;

pub use domain::{
    Dimension, DimensionWeights, GrowthPotential, ListingRecord, MatchFilters, MatchResult,
    RankedMatch, ScoringWeights, SearchCriteria, Searcher, SearcherKind,
};
pub use requests::{FindMatchesRequest, RankRequest, ScoreRequest, StoredScoresQuery};
pub use responses::{
    ErrorResponse, FindMatchesResponse, HealthResponse, InvalidationResponse, RankResponse,
    StoredScoresResponse,
};
