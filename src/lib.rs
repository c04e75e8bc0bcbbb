//! Smart Match - compatibility scoring for the business brokerage marketplace
//!
//! This library scores how well a listing fits an acquisition search, either
//! structured buyer criteria or a peer listing, and ranks candidate listings
//! by that score. The HTTP service in `main.rs` wraps it with the listing
//! store, score persistence and caching.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{filter_matches, score_candidate, MatchOutcome, Matcher, SearchProfile};
pub use models::{
    Dimension, ListingRecord, MatchFilters, MatchResult, RankedMatch, ScoringWeights,
    SearchCriteria, Searcher,
};
