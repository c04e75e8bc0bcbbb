use std::collections::BTreeSet;

use crate::models::{Dimension, GrowthPotential, ListingRecord, SearchCriteria, Searcher};

/// How a profile compares against candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMode {
    /// Searcher is itself a listing: symmetric, additive points
    Peer,
    /// Searcher is a set of preferences: asymmetric, weighted average
    Criteria,
}

/// Budget side of a profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetTarget {
    /// Asking price of a peer listing
    Price(f64),
    /// Acceptable range; a missing bound is open on that side
    Range { min: Option<f64>, max: Option<f64> },
}

/// Normalized searcher
///
/// Whether the searcher arrived as structured criteria or as a peer listing,
/// scoring runs against this single shape. The mode tells each dimension rule
/// which comparison to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchProfile {
    pub id: Option<String>,
    pub mode: ComparisonMode,
    pub dimensions: BTreeSet<Dimension>,
    pub budget: Option<BudgetTarget>,
    pub sectors: Vec<String>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub employee_count: Option<u32>,
    pub annual_revenue: Option<f64>,
    pub growth_potential: Option<GrowthPotential>,
}

/// Dimensions a peer listing is compared on
const PEER_DIMENSIONS: [Dimension; 5] = [
    Dimension::Budget,
    Dimension::Sector,
    Dimension::Location,
    Dimension::Employees,
    Dimension::Revenue,
];

/// Dimensions structured criteria can express
const CRITERIA_DIMENSIONS: [Dimension; 4] = [
    Dimension::Budget,
    Dimension::Sector,
    Dimension::Location,
    Dimension::GrowthPotential,
];

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl SearchProfile {
    /// Build a peer-mode profile from a listing
    pub fn from_listing(listing: &ListingRecord) -> Self {
        Self {
            id: listing.id.clone(),
            mode: ComparisonMode::Peer,
            dimensions: PEER_DIMENSIONS.into_iter().collect(),
            budget: finite(listing.asking_price).map(BudgetTarget::Price),
            sectors: listing.sector.iter().cloned().collect(),
            location: listing.location.clone(),
            region: listing.region.clone(),
            country: listing.country.clone(),
            employee_count: listing.employee_count,
            annual_revenue: finite(listing.annual_revenue),
            growth_potential: None,
        }
    }

    /// Build a criteria-mode profile from structured preferences
    pub fn from_criteria(criteria: &SearchCriteria) -> Self {
        let dimensions = criteria
            .selected_criteria
            .iter()
            .copied()
            .filter(|d| CRITERIA_DIMENSIONS.contains(d))
            .collect();

        let budget = match (finite(criteria.budget_min), finite(criteria.budget_max)) {
            (None, None) => None,
            (Some(min), Some(max)) if min > max => Some(BudgetTarget::Range {
                min: Some(max),
                max: Some(min),
            }),
            (min, max) => Some(BudgetTarget::Range { min, max }),
        };

        Self {
            id: criteria.id.clone(),
            mode: ComparisonMode::Criteria,
            dimensions,
            budget,
            sectors: criteria.sectors.clone(),
            location: criteria.location.clone(),
            region: None,
            country: None,
            employee_count: None,
            annual_revenue: None,
            growth_potential: criteria.growth_potential,
        }
    }

    pub fn selects(&self, dimension: Dimension) -> bool {
        self.dimensions.contains(&dimension)
    }

    /// True when the candidate is the searcher itself
    pub fn is_self(&self, candidate: &ListingRecord) -> bool {
        matches!((&self.id, &candidate.id), (Some(own), Some(other)) if own == other)
    }
}

impl From<&Searcher> for SearchProfile {
    fn from(searcher: &Searcher) -> Self {
        match searcher {
            Searcher::Criteria(criteria) => SearchProfile::from_criteria(criteria),
            Searcher::Listing(listing) => SearchProfile::from_listing(listing),
        }
    }
}
