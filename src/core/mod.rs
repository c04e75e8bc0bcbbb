// Core algorithm exports
pub mod filters;
pub mod location;
pub mod matcher;
pub mod profile;
pub mod scoring;
pub mod sectors;

pub use filters::{filter_matches, matches_filters};
pub use location::{fuzzy_location_match, geo_level, GeoLevel, Geography, LocationMatch};
pub use matcher::{MatchOutcome, Matcher};
pub use profile::{BudgetTarget, ComparisonMode, SearchProfile};
pub use scoring::{score_candidate, DimensionScore, Verdict, INSUFFICIENT_DATA, MATCHED_THRESHOLD};
pub use sectors::{sector_affinity, sector_families, sector_family, SectorAffinity};
