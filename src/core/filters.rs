use crate::core::sectors::same_sector;
use crate::models::{MatchFilters, RankedMatch};

/// Check a ranked match against every present filter
///
/// Absent filters always pass. A budget filter requires the candidate to
/// publish an asking price.
#[inline]
pub fn matches_filters(ranked: &RankedMatch, filters: &MatchFilters) -> bool {
    let listing = &ranked.listing;

    if let Some(min_score) = filters.min_score {
        if ranked.score() < min_score {
            return false;
        }
    }

    if let Some(sector) = filters.sector.as_deref() {
        match listing.sector.as_deref() {
            Some(candidate) if same_sector(candidate, sector) => {}
            _ => return false,
        }
    }

    if let Some(location) = filters.location.as_deref() {
        let wanted = location.trim().to_lowercase();
        match listing.location.as_deref() {
            Some(candidate) if candidate.to_lowercase().contains(&wanted) => {}
            _ => return false,
        }
    }

    if filters.min_budget.is_some() || filters.max_budget.is_some() {
        let Some(price) = listing.asking_price else {
            return false;
        };
        if filters.min_budget.is_some_and(|min| price < min) {
            return false;
        }
        if filters.max_budget.is_some_and(|max| price > max) {
            return false;
        }
    }

    true
}

/// Keep the ranked matches passing all filters, preserving their order
pub fn filter_matches(ranked: Vec<RankedMatch>, filters: &MatchFilters) -> Vec<RankedMatch> {
    if filters.is_empty() {
        return ranked;
    }

    ranked
        .into_iter()
        .filter(|m| matches_filters(m, filters))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingRecord, MatchResult};
    use std::collections::BTreeMap;

    fn ranked(id: &str, score: f64, sector: Option<&str>, location: Option<&str>, price: Option<f64>) -> RankedMatch {
        RankedMatch {
            listing: ListingRecord {
                id: Some(id.to_string()),
                sector: sector.map(str::to_string),
                location: location.map(str::to_string),
                asking_price: price,
                ..Default::default()
            },
            result: MatchResult {
                score,
                breakdown: BTreeMap::new(),
                explanation: vec![],
                criteria_matched_count: 0,
            },
        }
    }

    fn ids(matches: &[RankedMatch]) -> Vec<&str> {
        matches.iter().filter_map(|m| m.listing.id.as_deref()).collect()
    }

    #[test]
    fn test_empty_filters_keep_everything() {
        let input = vec![ranked("a", 10.0, None, None, None), ranked("b", 90.0, None, None, None)];
        let output = filter_matches(input, &MatchFilters::default());
        assert_eq!(ids(&output), vec!["a", "b"]);
    }

    #[test]
    fn test_location_substring_case_insensitive() {
        let input = vec![
            ranked("a", 80.0, None, Some("Lyon 3e"), None),
            ranked("b", 70.0, None, Some("Paris"), None),
            ranked("c", 60.0, None, None, None),
        ];
        let filters = MatchFilters {
            location: Some("lyon".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_matches(input, &filters)), vec!["a"]);
    }

    #[test]
    fn test_budget_bounds_on_asking_price() {
        let input = vec![
            ranked("a", 80.0, None, None, Some(90000.0)),
            ranked("b", 70.0, None, None, Some(150000.0)),
            ranked("c", 60.0, None, None, Some(250000.0)),
            ranked("d", 50.0, None, None, None),
        ];
        let filters = MatchFilters {
            min_budget: Some(100000.0),
            max_budget: Some(200000.0),
            ..Default::default()
        };
        assert_eq!(ids(&filter_matches(input, &filters)), vec!["b"]);
    }
}
