/// Number of leading characters two localities must share to count as similar
const PREFIX_LEN: usize = 3;

/// Sub-scores for free-text locality matching
pub const LOCATION_EXACT: f64 = 100.0;
pub const LOCATION_CONTAINS: f64 = 85.0;
pub const LOCATION_PREFIX: f64 = 70.0;
/// Free-text geography stays weakly informative on a mismatch
pub const LOCATION_FLOOR: f64 = 40.0;

/// Sub-scores for the locality / region / country ladder
pub const SAME_LOCALITY: f64 = 100.0;
pub const SAME_REGION: f64 = 60.0;
pub const SAME_COUNTRY: f64 = 40.0;

/// How closely a free-text location matches a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationMatch {
    Exact,
    Contains,
    Prefix,
    Distant,
}

impl LocationMatch {
    pub fn score(&self) -> f64 {
        match self {
            LocationMatch::Exact => LOCATION_EXACT,
            LocationMatch::Contains => LOCATION_CONTAINS,
            LocationMatch::Prefix => LOCATION_PREFIX,
            LocationMatch::Distant => LOCATION_FLOOR,
        }
    }
}

/// Geographic level at which two listings coincide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoLevel {
    Locality,
    Region,
    Country,
    None,
}

impl GeoLevel {
    pub fn score(&self) -> f64 {
        match self {
            GeoLevel::Locality => SAME_LOCALITY,
            GeoLevel::Region => SAME_REGION,
            GeoLevel::Country => SAME_COUNTRY,
            GeoLevel::None => 0.0,
        }
    }
}

/// Locality, region and country of one side of a comparison
#[derive(Debug, Clone, Copy, Default)]
pub struct Geography<'a> {
    pub location: Option<&'a str>,
    pub region: Option<&'a str>,
    pub country: Option<&'a str>,
}

#[inline]
fn normalize(place: &str) -> String {
    place.trim().to_lowercase()
}

#[inline]
fn same_place(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Fuzzy match of a candidate locality against a searched one
pub fn fuzzy_location_match(target: &str, candidate: &str) -> LocationMatch {
    let target = normalize(target);
    let candidate = normalize(candidate);

    if target == candidate {
        return LocationMatch::Exact;
    }

    if !target.is_empty()
        && !candidate.is_empty()
        && (target.contains(&candidate) || candidate.contains(&target))
    {
        return LocationMatch::Contains;
    }

    let target_prefix: Vec<char> = target.chars().take(PREFIX_LEN).collect();
    let candidate_prefix: Vec<char> = candidate.chars().take(PREFIX_LEN).collect();
    if target_prefix.len() == PREFIX_LEN && target_prefix == candidate_prefix {
        return LocationMatch::Prefix;
    }

    LocationMatch::Distant
}

/// Compare two geographies level by level, most precise first
///
/// Returns `None` when no level is known on both sides.
pub fn geo_level(a: &Geography<'_>, b: &Geography<'_>) -> Option<(GeoLevel, String)> {
    let levels = [
        (GeoLevel::Locality, a.location, b.location),
        (GeoLevel::Region, a.region, b.region),
        (GeoLevel::Country, a.country, b.country),
    ];

    let mut comparable = false;
    for (level, left, right) in levels {
        if let (Some(left), Some(right)) = (left, right) {
            comparable = true;
            if same_place(left, right) {
                return Some((level, right.trim().to_string()));
            }
        }
    }

    comparable.then(|| (GeoLevel::None, String::new()))
}
