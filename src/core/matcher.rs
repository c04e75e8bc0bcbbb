use crate::core::{filters::filter_matches, profile::SearchProfile, scoring::score_candidate};
use crate::models::{ListingRecord, MatchFilters, MatchResult, RankedMatch, ScoringWeights, Searcher};

/// Result of the ranking pipeline
#[derive(Debug)]
pub struct MatchOutcome {
    pub matches: Vec<RankedMatch>,
    pub total_candidates: usize,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Normalize the searcher into a profile
/// 2. Score every candidate except the searcher itself
/// 3. Stable sort by score, descending
/// 4. Filter and truncate
///
/// Holds nothing but weights, so it is cheap to clone and safe to share
/// between workers.
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one candidate against a searcher
    pub fn score(&self, searcher: &Searcher, candidate: &ListingRecord) -> MatchResult {
        self.score_profile(&SearchProfile::from(searcher), candidate)
    }

    /// Score one candidate against an already normalized profile
    pub fn score_profile(&self, profile: &SearchProfile, candidate: &ListingRecord) -> MatchResult {
        score_candidate(profile, candidate, &self.weights)
    }

    /// Score and rank candidates against a searcher
    ///
    /// The candidate sharing the searcher's id is skipped. Candidates with
    /// equal scores keep their input order.
    pub fn rank_matches(&self, searcher: &Searcher, candidates: Vec<ListingRecord>) -> Vec<RankedMatch> {
        let profile = SearchProfile::from(searcher);

        let mut ranked: Vec<RankedMatch> = candidates
            .into_iter()
            .filter(|candidate| !profile.is_self(candidate))
            .map(|candidate| {
                let result = self.score_profile(&profile, &candidate);
                RankedMatch {
                    listing: candidate,
                    result,
                }
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));

        ranked
    }

    /// Rank, filter and truncate in one pass
    ///
    /// # Arguments
    /// * `searcher` - Criteria or peer listing to match against
    /// * `candidates` - Listings to score
    /// * `filters` - Applied after ranking, order is preserved
    /// * `limit` - Maximum number of matches to return
    pub fn find_matches(
        &self,
        searcher: &Searcher,
        candidates: Vec<ListingRecord>,
        filters: &MatchFilters,
        limit: usize,
    ) -> MatchOutcome {
        let total_candidates = candidates.len();

        let mut matches = filter_matches(self.rank_matches(searcher, candidates), filters);
        matches.truncate(limit);

        tracing::debug!(
            "Ranked {} candidates for {:?}, returning {}",
            total_candidates,
            searcher.id(),
            matches.len()
        );

        MatchOutcome {
            matches,
            total_candidates,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dimension, SearchCriteria};
    use std::collections::BTreeSet;

    fn candidate(id: &str, price: f64, sector: &str) -> ListingRecord {
        ListingRecord {
            id: Some(id.to_string()),
            asking_price: Some(price),
            sector: Some(sector.to_string()),
            ..Default::default()
        }
    }

    fn buyer() -> Searcher {
        Searcher::Criteria(SearchCriteria {
            id: Some("buyer".to_string()),
            selected_criteria: BTreeSet::from([Dimension::Budget, Dimension::Sector]),
            budget_min: Some(100000.0),
            budget_max: Some(200000.0),
            sectors: vec!["Technology".to_string()],
            ..Default::default()
        })
    }

    #[test]
    fn test_rank_sorted_by_score() {
        let matcher = Matcher::with_default_weights();

        let ranked = matcher.rank_matches(
            &buyer(),
            vec![
                candidate("far", 900000.0, "Plomberie"),
                candidate("best", 150000.0, "technology"),
                candidate("mid", 150000.0, "Plomberie"),
            ],
        );

        let ids: Vec<_> = ranked.iter().filter_map(|m| m.listing.id.as_deref()).collect();
        assert_eq!(ids, vec!["best", "mid", "far"]);
    }

    #[test]
    fn test_rank_excludes_searcher() {
        let matcher = Matcher::with_default_weights();
        let own = candidate("mine", 150000.0, "Technology");
        let searcher = Searcher::Listing(own.clone());

        let ranked = matcher.rank_matches(&searcher, vec![own, candidate("other", 150000.0, "Technology")]);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].listing.id.as_deref(), Some("other"));
    }

    #[test]
    fn test_find_matches_respects_limit() {
        let matcher = Matcher::with_default_weights();
        let candidates: Vec<ListingRecord> = (0..20)
            .map(|i| candidate(&i.to_string(), 100000.0 + i as f64 * 10000.0, "Technology"))
            .collect();

        let outcome = matcher.find_matches(&buyer(), candidates, &MatchFilters::default(), 5);

        assert_eq!(outcome.matches.len(), 5);
        assert_eq!(outcome.total_candidates, 20);
    }

    #[test]
    fn test_find_matches_filters_after_ranking() {
        let matcher = Matcher::with_default_weights();
        let filters = MatchFilters {
            min_score: Some(60.0),
            ..Default::default()
        };

        let outcome = matcher.find_matches(
            &buyer(),
            vec![candidate("a", 150000.0, "Plomberie"), candidate("b", 150000.0, "Technology")],
            &filters,
            10,
        );

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].listing.id.as_deref(), Some("b"));
    }
}
