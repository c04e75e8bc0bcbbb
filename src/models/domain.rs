use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::models::lenient;

/// A published listing: a business for sale or an acquisition search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        alias = "asking_price",
        alias = "price",
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub asking_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(
        default,
        alias = "employee_count",
        alias = "employees",
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub employee_count: Option<u32>,
    #[serde(
        default,
        alias = "annual_revenue",
        alias = "revenue",
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub annual_revenue: Option<f64>,
    #[serde(
        default,
        alias = "growth_potential",
        deserialize_with = "lenient::growth",
        skip_serializing_if = "Option::is_none"
    )]
    pub growth_potential: Option<GrowthPotential>,
}

/// Structured acquisition preferences of a buyer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "selected_criteria", deserialize_with = "lenient::dimensions")]
    pub selected_criteria: BTreeSet<Dimension>,
    #[serde(
        default,
        alias = "budget_min",
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget_min: Option<f64>,
    #[serde(
        default,
        alias = "budget_max",
        deserialize_with = "lenient::decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub sectors: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        default,
        alias = "growth_potential",
        deserialize_with = "lenient::growth",
        skip_serializing_if = "Option::is_none"
    )]
    pub growth_potential: Option<GrowthPotential>,
}

/// The side of a comparison expressing preferences
///
/// A buyer either fills in structured criteria or points at one of their own
/// listings and asks for similar businesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Searcher {
    Criteria(SearchCriteria),
    Listing(ListingRecord),
}

impl Searcher {
    /// Identity of the searcher, used for self-exclusion and persistence keys
    pub fn id(&self) -> Option<&str> {
        match self {
            Searcher::Criteria(criteria) => criteria.id.as_deref(),
            Searcher::Listing(listing) => listing.id.as_deref(),
        }
    }

    pub fn kind(&self) -> SearcherKind {
        match self {
            Searcher::Criteria(_) => SearcherKind::Criteria,
            Searcher::Listing(_) => SearcherKind::Listing,
        }
    }
}

/// Where a stored searcher lives in the listing store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearcherKind {
    #[default]
    Listing,
    Criteria,
}

impl SearcherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearcherKind::Listing => "listing",
            SearcherKind::Criteria => "criteria",
        }
    }
}

/// Expected growth of a business
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthPotential {
    High,
    Medium,
    Low,
}

impl GrowthPotential {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthPotential::High => "high",
            GrowthPotential::Medium => "medium",
            GrowthPotential::Low => "low",
        }
    }
}

impl fmt::Display for GrowthPotential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrowthPotential {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "élevé" | "eleve" | "fort" => Ok(GrowthPotential::High),
            "medium" | "moyen" | "modéré" | "modere" => Ok(GrowthPotential::Medium),
            "low" | "faible" => Ok(GrowthPotential::Low),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// One independently scored attribute of comparability
///
/// Declaration order is evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Budget,
    Sector,
    Location,
    Employees,
    Revenue,
    GrowthPotential,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Budget,
        Dimension::Sector,
        Dimension::Location,
        Dimension::Employees,
        Dimension::Revenue,
        Dimension::GrowthPotential,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Budget => "budget",
            Dimension::Sector => "sector",
            Dimension::Location => "location",
            Dimension::Employees => "employees",
            Dimension::Revenue => "revenue",
            Dimension::GrowthPotential => "growth_potential",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();

        match key.as_str() {
            "budget" | "price" | "askingprice" => Ok(Dimension::Budget),
            "sector" | "sectors" | "secteur" | "industry" => Ok(Dimension::Sector),
            "location" | "localisation" | "geography" => Ok(Dimension::Location),
            "employees" | "employeecount" => Ok(Dimension::Employees),
            "revenue" | "annualrevenue" => Ok(Dimension::Revenue),
            "growth" | "growthpotential" => Ok(Dimension::GrowthPotential),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Returned when a label does not name a known enum value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown label: {}", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

/// Outcome of scoring one (searcher, candidate) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub score: f64,
    pub breakdown: BTreeMap<Dimension, f64>,
    pub explanation: Vec<String>,
    pub criteria_matched_count: u32,
}

/// A candidate listing with its match result attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub listing: ListingRecord,
    #[serde(rename = "match")]
    pub result: MatchResult,
}

impl RankedMatch {
    pub fn score(&self) -> f64 {
        self.result.score
    }
}

/// Post-ranking restrictions, AND-composed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFilters {
    #[serde(default, deserialize_with = "lenient::decimal", skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal", skip_serializing_if = "Option::is_none")]
    pub min_budget: Option<f64>,
    #[serde(default, deserialize_with = "lenient::decimal", skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
}

impl MatchFilters {
    pub fn is_empty(&self) -> bool {
        self.min_score.is_none()
            && self.sector.is_none()
            && self.location.is_none()
            && self.min_budget.is_none()
            && self.max_budget.is_none()
    }
}

/// Per-dimension weights for one comparison mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub budget: f64,
    pub sector: f64,
    pub location: f64,
    pub employees: f64,
    pub revenue: f64,
    pub growth_potential: f64,
}

impl DimensionWeights {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Budget => self.budget,
            Dimension::Sector => self.sector,
            Dimension::Location => self.location,
            Dimension::Employees => self.employees,
            Dimension::Revenue => self.revenue,
            Dimension::GrowthPotential => self.growth_potential,
        }
    }
}

/// Scoring weights
///
/// Criteria weights are relative (weighted average); peer points are
/// absolute and summed, then capped at 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub criteria: DimensionWeights,
    pub peer: DimensionWeights,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            criteria: DimensionWeights {
                budget: 3.0,
                sector: 3.0,
                location: 2.0,
                employees: 0.0,
                revenue: 0.0,
                growth_potential: 2.0,
            },
            peer: DimensionWeights {
                budget: 40.0,
                sector: 30.0,
                location: 20.0,
                employees: 5.0,
                revenue: 5.0,
                growth_potential: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_lenient_fields() {
        let listing: ListingRecord = serde_json::from_value(json!({
            "id": "l1",
            "askingPrice": "abc",
            "sector": "  ",
            "employee_count": "12",
            "annualRevenue": "450 000",
            "growthPotential": "unknown"
        }))
        .unwrap();

        assert_eq!(listing.id.as_deref(), Some("l1"));
        assert_eq!(listing.asking_price, None);
        assert_eq!(listing.sector, None);
        assert_eq!(listing.employee_count, Some(12));
        assert_eq!(listing.annual_revenue, Some(450000.0));
        assert_eq!(listing.growth_potential, None);
    }

    #[test]
    fn test_criteria_drops_unknown_dimensions() {
        let criteria: SearchCriteria = serde_json::from_value(json!({
            "selectedCriteria": ["budget", "Sector", "colour", "growthPotential"],
            "sectors": "Restauration"
        }))
        .unwrap();

        assert_eq!(
            criteria.selected_criteria,
            BTreeSet::from([Dimension::Budget, Dimension::Sector, Dimension::GrowthPotential])
        );
        assert_eq!(criteria.sectors, vec!["Restauration".to_string()]);
    }

    #[test]
    fn test_searcher_tagged_by_kind() {
        let searcher: Searcher = serde_json::from_value(json!({
            "kind": "listing",
            "id": "seller-1",
            "sector": "Technology"
        }))
        .unwrap();

        assert_eq!(searcher.kind(), SearcherKind::Listing);
        assert_eq!(searcher.id(), Some("seller-1"));
    }

    #[test]
    fn test_growth_potential_labels() {
        assert_eq!("HIGH".parse::<GrowthPotential>(), Ok(GrowthPotential::High));
        assert_eq!("moyen".parse::<GrowthPotential>(), Ok(GrowthPotential::Medium));
        assert!("sideways".parse::<GrowthPotential>().is_err());
    }

    #[test]
    fn test_breakdown_serializes_with_dimension_keys() {
        let result = MatchResult {
            score: 80.0,
            breakdown: BTreeMap::from([(Dimension::GrowthPotential, 70.0)]),
            explanation: vec!["✅ Growth potential".to_string()],
            criteria_matched_count: 1,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["breakdown"]["growth_potential"], json!(70.0));
        assert_eq!(value["criteriaMatchedCount"], json!(1));
    }

    #[test]
    fn test_default_weights() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.peer.get(Dimension::Budget), 40.0);
        assert_eq!(weights.criteria.get(Dimension::GrowthPotential), 2.0);
    }
}
