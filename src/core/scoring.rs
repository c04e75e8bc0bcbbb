use std::collections::BTreeMap;

use crate::core::location::{fuzzy_location_match, geo_level, GeoLevel, Geography, LocationMatch};
use crate::core::profile::{BudgetTarget, ComparisonMode, SearchProfile};
use crate::core::sectors::{same_sector, sector_affinity, SectorAffinity};
use crate::models::{Dimension, ListingRecord, MatchResult, ScoringWeights};

/// Sub-score at or above which a dimension counts as matched
pub const MATCHED_THRESHOLD: f64 = 70.0;
/// Sub-score at or above which a dimension is flagged as partial
pub const PARTIAL_THRESHOLD: f64 = 50.0;

/// Out-of-range budgets never drop below this: the price may still be negotiable
pub const BUDGET_FLOOR: f64 = 30.0;
/// Points lost per percent of overshoot past a budget bound
pub const BUDGET_PENALTY_PER_PERCENT: f64 = 0.3;

/// Growth potentials that differ still earn partial credit
pub const GROWTH_MISMATCH: f64 = 70.0;

/// Employee headcounts closer than this are considered similar
pub const EMPLOYEE_TOLERANCE: u32 = 3;
/// Revenues within this relative difference (percent) are considered comparable
pub const REVENUE_TOLERANCE_PCT: f64 = 20.0;

pub const INSUFFICIENT_DATA: &str = "insufficient data to compare";

/// Classification of a sub-score for the explanation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Partial,
    Mismatch,
}

impl Verdict {
    pub fn from_score(sub_score: f64) -> Self {
        if sub_score >= MATCHED_THRESHOLD {
            Verdict::Match
        } else if sub_score >= PARTIAL_THRESHOLD {
            Verdict::Partial
        } else {
            Verdict::Mismatch
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Verdict::Match => "✅",
            Verdict::Partial => "⚠️",
            Verdict::Mismatch => "❌",
        }
    }
}

/// One evaluated dimension before aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub sub_score: f64,
    pub note: String,
}

impl DimensionScore {
    fn new(dimension: Dimension, sub_score: f64, note: String) -> Self {
        Self {
            dimension,
            sub_score: sub_score.clamp(0.0, 100.0),
            note,
        }
    }

    /// Explanation line: verdict tag followed by the note
    pub fn annotation(&self) -> String {
        format!("{} {}", Verdict::from_score(self.sub_score).tag(), self.note)
    }
}

/// Score a candidate listing against a search profile
///
/// Every selected dimension whose inputs are present on both sides is
/// evaluated in `Dimension::ALL` order. Peer profiles add up weighted points
/// (capped at 100); criteria profiles take the weighted average of the
/// evaluated sub-scores. Never fails: missing or non-finite inputs only skip
/// the dimension they feed.
pub fn score_candidate(
    profile: &SearchProfile,
    candidate: &ListingRecord,
    weights: &ScoringWeights,
) -> MatchResult {
    let evaluated: Vec<DimensionScore> = Dimension::ALL
        .iter()
        .filter(|dimension| profile.selects(**dimension))
        .filter_map(|dimension| evaluate_dimension(*dimension, profile, candidate))
        .collect();

    if evaluated.is_empty() {
        return MatchResult {
            score: 0.0,
            breakdown: BTreeMap::new(),
            explanation: vec![INSUFFICIENT_DATA.to_string()],
            criteria_matched_count: 0,
        };
    }

    let mode_weights = match profile.mode {
        ComparisonMode::Peer => &weights.peer,
        ComparisonMode::Criteria => &weights.criteria,
    };

    let raw_score = match profile.mode {
        ComparisonMode::Peer => evaluated
            .iter()
            .map(|d| d.sub_score / 100.0 * mode_weights.get(d.dimension))
            .sum::<f64>()
            .min(100.0),
        ComparisonMode::Criteria => {
            let (weighted, total_weight) = evaluated.iter().fold((0.0, 0.0), |(sum, total), d| {
                let weight = mode_weights.get(d.dimension);
                (sum + d.sub_score * weight, total + weight)
            });
            if total_weight > 0.0 {
                weighted / total_weight
            } else {
                0.0
            }
        }
    };

    let criteria_matched_count = evaluated
        .iter()
        .filter(|d| d.sub_score >= MATCHED_THRESHOLD)
        .count() as u32;

    MatchResult {
        score: round2(raw_score).clamp(0.0, 100.0),
        breakdown: evaluated
            .iter()
            .map(|d| (d.dimension, round2(d.sub_score)))
            .collect(),
        explanation: evaluated.iter().map(DimensionScore::annotation).collect(),
        criteria_matched_count,
    }
}

/// Run the rule for one dimension; `None` means "not applicable"
pub fn evaluate_dimension(
    dimension: Dimension,
    profile: &SearchProfile,
    candidate: &ListingRecord,
) -> Option<DimensionScore> {
    match dimension {
        Dimension::Budget => score_budget(profile, candidate),
        Dimension::Sector => score_sector(profile, candidate),
        Dimension::Location => score_location(profile, candidate),
        Dimension::Employees => score_employees(profile, candidate),
        Dimension::Revenue => score_revenue(profile, candidate),
        Dimension::GrowthPotential => score_growth(profile, candidate),
    }
}

fn score_budget(profile: &SearchProfile, candidate: &ListingRecord) -> Option<DimensionScore> {
    let price = candidate.asking_price.filter(|p| p.is_finite())?;

    let (sub_score, note) = match profile.budget? {
        BudgetTarget::Price(reference) => {
            let diff = relative_difference(reference, price);
            let note = format!(
                "Asking prices differ by {:.0}% ({:.0} vs {:.0})",
                diff, reference, price
            );
            (price_proximity_score(diff), note)
        }
        BudgetTarget::Range { min, max } => {
            let sub_score = budget_range_score(price, min, max);
            let note = match (min, max) {
                (Some(min), _) if price < min => {
                    format!("Asking price {:.0} below budget minimum {:.0}", price, min)
                }
                (_, Some(max)) if price > max => {
                    format!("Asking price {:.0} above budget maximum {:.0}", price, max)
                }
                _ => format!("Asking price {:.0} within budget", price),
            };
            (sub_score, note)
        }
    };

    Some(DimensionScore::new(Dimension::Budget, sub_score, note))
}

fn score_sector(profile: &SearchProfile, candidate: &ListingRecord) -> Option<DimensionScore> {
    let sector = candidate.sector.as_deref()?;
    if profile.sectors.is_empty() {
        return None;
    }

    let (sub_score, note) = match profile.mode {
        ComparisonMode::Peer => {
            let reference = profile.sectors[0].as_str();
            match sector_affinity(reference, sector) {
                SectorAffinity::Identical => (100.0, format!("Same sector: {}", reference.trim())),
                SectorAffinity::Related(family) => (
                    50.0,
                    format!("Related sectors ({} / {}, {})", reference.trim(), sector, family),
                ),
                SectorAffinity::Unrelated => {
                    (0.0, format!("Different sectors ({} / {})", reference.trim(), sector))
                }
            }
        }
        ComparisonMode::Criteria => {
            if profile.sectors.iter().any(|wanted| same_sector(wanted, sector)) {
                (100.0, format!("Sector {} is a target sector", sector))
            } else {
                (0.0, format!("Sector {} is outside target sectors", sector))
            }
        }
    };

    Some(DimensionScore::new(Dimension::Sector, sub_score, note))
}

fn score_location(profile: &SearchProfile, candidate: &ListingRecord) -> Option<DimensionScore> {
    match profile.mode {
        ComparisonMode::Peer => {
            let own = Geography {
                location: profile.location.as_deref(),
                region: profile.region.as_deref(),
                country: profile.country.as_deref(),
            };
            let other = Geography {
                location: candidate.location.as_deref(),
                region: candidate.region.as_deref(),
                country: candidate.country.as_deref(),
            };

            let (level, place) = geo_level(&own, &other)?;
            let note = match level {
                GeoLevel::Locality => format!("Same location: {}", place),
                GeoLevel::Region => format!("Same region: {}", place),
                GeoLevel::Country => format!("Same country: {}", place),
                GeoLevel::None => "Different locations".to_string(),
            };
            Some(DimensionScore::new(Dimension::Location, level.score(), note))
        }
        ComparisonMode::Criteria => {
            let target = profile.location.as_deref()?;
            let location = candidate.location.as_deref()?;

            let matched = fuzzy_location_match(target, location);
            let note = match matched {
                LocationMatch::Exact => format!("Location matches: {}", location),
                LocationMatch::Contains | LocationMatch::Prefix => {
                    format!("Location {} close to {}", location, target)
                }
                LocationMatch::Distant => format!("Location {} far from {}", location, target),
            };
            Some(DimensionScore::new(Dimension::Location, matched.score(), note))
        }
    }
}

fn score_employees(profile: &SearchProfile, candidate: &ListingRecord) -> Option<DimensionScore> {
    let own = profile.employee_count?;
    let other = candidate.employee_count?;

    let (sub_score, note) = if own.abs_diff(other) <= EMPLOYEE_TOLERANCE {
        (100.0, format!("Similar workforce ({} vs {} employees)", own, other))
    } else {
        (0.0, format!("Workforce differs ({} vs {} employees)", own, other))
    };

    Some(DimensionScore::new(Dimension::Employees, sub_score, note))
}

fn score_revenue(profile: &SearchProfile, candidate: &ListingRecord) -> Option<DimensionScore> {
    let own = profile.annual_revenue?;
    let other = candidate.annual_revenue.filter(|r| r.is_finite())?;

    let diff = relative_difference(own, other);
    let (sub_score, note) = if diff <= REVENUE_TOLERANCE_PCT {
        (100.0, format!("Comparable revenue ({:.0}% apart)", diff))
    } else {
        (0.0, format!("Revenue differs by {:.0}%", diff))
    };

    Some(DimensionScore::new(Dimension::Revenue, sub_score, note))
}

fn score_growth(profile: &SearchProfile, candidate: &ListingRecord) -> Option<DimensionScore> {
    let wanted = profile.growth_potential?;
    let actual = candidate.growth_potential?;

    let (sub_score, note) = if wanted == actual {
        (100.0, format!("Growth potential matches: {}", actual))
    } else {
        (GROWTH_MISMATCH, format!("Growth potential {} (wanted {})", actual, wanted))
    };

    Some(DimensionScore::new(Dimension::GrowthPotential, sub_score, note))
}

/// Relative difference in percent: `|a - b| / max(|a|, |b|) * 100`
#[inline]
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let largest = a.abs().max(b.abs());
    if largest == 0.0 {
        return 0.0;
    }
    (a - b).abs() / largest * 100.0
}

/// Peer price proximity (0-100) from a relative difference in percent
#[inline]
pub fn price_proximity_score(diff_pct: f64) -> f64 {
    if diff_pct <= 10.0 {
        100.0
    } else if diff_pct <= 25.0 {
        62.5
    } else if diff_pct <= 50.0 {
        37.5
    } else {
        0.0
    }
}

/// Budget range fit (30-100)
///
/// Inside the range scores 100. Outside, the score drops linearly with the
/// overshoot measured relative to the crossed bound, never below
/// `BUDGET_FLOOR`.
#[inline]
pub fn budget_range_score(price: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    if let Some(min) = min {
        if price < min {
            return overshoot_score(min - price, min);
        }
    }
    if let Some(max) = max {
        if price > max {
            return overshoot_score(price - max, max);
        }
    }
    100.0
}

#[inline]
fn overshoot_score(distance: f64, bound: f64) -> f64 {
    if bound <= 0.0 {
        return BUDGET_FLOOR;
    }
    let overshoot_pct = distance * 100.0 / bound;
    (100.0 - overshoot_pct * BUDGET_PENALTY_PER_PERCENT).max(BUDGET_FLOOR)
}

#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GrowthPotential, SearchCriteria};
    use std::collections::BTreeSet;

    fn criteria(dimensions: &[Dimension]) -> SearchCriteria {
        SearchCriteria {
            id: Some("buyer".to_string()),
            selected_criteria: dimensions.iter().copied().collect::<BTreeSet<_>>(),
            budget_min: Some(100000.0),
            budget_max: Some(200000.0),
            sectors: vec!["Restauration".to_string(), "Technology".to_string()],
            location: Some("Lyon".to_string()),
            growth_potential: Some(GrowthPotential::High),
        }
    }

    fn listing(price: f64, sector: &str, location: &str) -> ListingRecord {
        ListingRecord {
            id: Some("listing".to_string()),
            asking_price: Some(price),
            sector: Some(sector.to_string()),
            location: Some(location.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_budget_range_score() {
        assert_eq!(budget_range_score(150000.0, Some(100000.0), Some(200000.0)), 100.0);
        assert_eq!(budget_range_score(250000.0, Some(100000.0), Some(200000.0)), 92.5);
        assert_eq!(budget_range_score(80000.0, Some(100000.0), Some(200000.0)), 94.0);
        assert_eq!(budget_range_score(2_000_000.0, None, Some(200000.0)), BUDGET_FLOOR);
        assert_eq!(budget_range_score(1.0, None, Some(200000.0)), 100.0);
    }

    #[test]
    fn test_price_proximity_thresholds() {
        assert_eq!(price_proximity_score(0.0), 100.0);
        assert_eq!(price_proximity_score(10.0), 100.0);
        assert_eq!(price_proximity_score(20.0), 62.5);
        assert_eq!(price_proximity_score(40.0), 37.5);
        assert_eq!(price_proximity_score(51.0), 0.0);
    }

    #[test]
    fn test_relative_difference() {
        assert_eq!(relative_difference(100.0, 90.0), 10.0);
        assert_eq!(relative_difference(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_criteria_weighted_average() {
        let profile = SearchProfile::from_criteria(&criteria(&[Dimension::Budget, Dimension::Sector]));
        let candidate = listing(250000.0, "Plomberie", "Lyon");

        let result = score_candidate(&profile, &candidate, &ScoringWeights::default());

        // (92.5 * 3 + 0 * 3) / 6
        assert_eq!(result.score, 46.25);
        assert_eq!(result.breakdown.get(&Dimension::Budget), Some(&92.5));
        assert_eq!(result.breakdown.get(&Dimension::Sector), Some(&0.0));
        assert_eq!(result.criteria_matched_count, 1);
        assert_eq!(result.explanation.len(), 2);
        assert!(result.explanation[0].starts_with("✅"));
        assert!(result.explanation[1].starts_with("❌"));
    }

    #[test]
    fn test_growth_partial_credit() {
        let profile = SearchProfile::from_criteria(&criteria(&[Dimension::GrowthPotential]));
        let mut candidate = listing(150000.0, "Technology", "Lyon");
        candidate.growth_potential = Some(GrowthPotential::Low);

        let result = score_candidate(&profile, &candidate, &ScoringWeights::default());
        assert_eq!(result.score, 70.0);
        assert_eq!(result.criteria_matched_count, 1);

        candidate.growth_potential = None;
        let result = score_candidate(&profile, &candidate, &ScoringWeights::default());
        assert!(result.breakdown.is_empty());
        assert_eq!(result.explanation, vec![INSUFFICIENT_DATA.to_string()]);
    }

    #[test]
    fn test_criteria_location_floor() {
        let profile = SearchProfile::from_criteria(&criteria(&[Dimension::Location]));
        let candidate = listing(150000.0, "Technology", "Brest");

        let result = score_candidate(&profile, &candidate, &ScoringWeights::default());
        assert_eq!(result.breakdown.get(&Dimension::Location), Some(&40.0));
        assert!(result.explanation[0].starts_with("❌"));
    }

    #[test]
    fn test_peer_points_add_up() {
        let mut own = listing(100000.0, "Pizzeria", "Lyon");
        own.employee_count = Some(5);
        own.annual_revenue = Some(300000.0);
        let mut other = listing(120000.0, "Restauration", "Villeurbanne");
        other.id = Some("other".to_string());
        other.employee_count = Some(7);
        other.annual_revenue = Some(320000.0);

        let profile = SearchProfile::from_listing(&own);
        let result = score_candidate(&profile, &other, &ScoringWeights::default());

        // price 16.7% apart -> 25, related sector -> 15, locality differs -> 0, employees 5, revenue 5
        assert_eq!(result.score, 50.0);
        assert_eq!(result.breakdown.get(&Dimension::Budget), Some(&62.5));
        assert_eq!(result.breakdown.get(&Dimension::Sector), Some(&50.0));
        assert_eq!(result.breakdown.get(&Dimension::Location), Some(&0.0));
        assert_eq!(result.criteria_matched_count, 2);
        assert!(result.explanation[0].starts_with("⚠️"));
    }

    #[test]
    fn test_peer_points_capped_at_100() {
        let mut own = listing(100000.0, "Technology", "Lyon");
        own.employee_count = Some(5);
        own.annual_revenue = Some(300000.0);
        let mut other = own.clone();
        other.id = Some("other".to_string());

        let mut weights = ScoringWeights::default();
        weights.peer.budget = 60.0;

        // 60 + 30 + 20 + 5 + 5 = 120 points before the cap
        let result = score_candidate(&SearchProfile::from_listing(&own), &other, &weights);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.breakdown.len(), 5);
        assert_eq!(result.criteria_matched_count, 5);
    }

    fn workforce(count: u32) -> ListingRecord {
        ListingRecord {
            employee_count: Some(count),
            ..Default::default()
        }
    }

    fn revenue(amount: f64) -> ListingRecord {
        ListingRecord {
            annual_revenue: Some(amount),
            ..Default::default()
        }
    }

    #[test]
    fn test_peer_employee_tolerance() {
        let profile = SearchProfile::from_listing(&workforce(10));
        let weights = ScoringWeights::default();

        let within = score_candidate(&profile, &workforce(13), &weights);
        assert_eq!(within.score, 5.0);
        assert_eq!(within.breakdown.get(&Dimension::Employees), Some(&100.0));

        let beyond = score_candidate(&profile, &workforce(14), &weights);
        assert_eq!(beyond.score, 0.0);
        assert_eq!(beyond.breakdown.get(&Dimension::Employees), Some(&0.0));
        assert_eq!(beyond.criteria_matched_count, 0);
        assert!(beyond.explanation[0].starts_with("❌"));
    }

    #[test]
    fn test_peer_revenue_tolerance() {
        let profile = SearchProfile::from_listing(&revenue(100000.0));
        let weights = ScoringWeights::default();

        let within = score_candidate(&profile, &revenue(80000.0), &weights);
        assert_eq!(within.score, 5.0);
        assert_eq!(within.breakdown.get(&Dimension::Revenue), Some(&100.0));

        let beyond = score_candidate(&profile, &revenue(75000.0), &weights);
        assert_eq!(beyond.score, 0.0);
        assert_eq!(beyond.breakdown.get(&Dimension::Revenue), Some(&0.0));
        assert!(beyond.explanation[0].contains("Revenue differs by 25%"));
    }

    #[test]
    fn test_peer_location_region() {
        let mut own = ListingRecord::default();
        own.location = Some("Lyon".to_string());
        own.region = Some("Auvergne-Rhône-Alpes".to_string());
        let mut other = ListingRecord::default();
        other.location = Some("Annecy".to_string());
        other.region = Some("Auvergne-Rhône-Alpes".to_string());

        let result = score_candidate(
            &SearchProfile::from_listing(&own),
            &other,
            &ScoringWeights::default(),
        );
        assert_eq!(result.score, 12.0);
        assert_eq!(result.breakdown.get(&Dimension::Location), Some(&60.0));
        assert!(result.explanation[0].contains("Same region"));
    }

    #[test]
    fn test_verdict_tags() {
        assert_eq!(Verdict::from_score(70.0), Verdict::Match);
        assert_eq!(Verdict::from_score(50.0), Verdict::Partial);
        assert_eq!(Verdict::from_score(69.99), Verdict::Partial);
        assert_eq!(Verdict::from_score(49.0), Verdict::Mismatch);
    }
}
