/// Canonical sector families and the free-text fragments that belong to them
///
/// Sellers type their sector by hand, so "Pizzeria du port" and
/// "Restauration rapide" should be recognized as neighbours even though the
/// strings differ.
const SECTOR_FAMILIES: &[(&str, &[&str])] = &[
    (
        "restauration",
        &["restaurant", "café", "cafe", "pizzeria", "boulangerie", "brasserie", "traiteur", "bar"],
    ),
    (
        "commerce",
        &["boutique", "magasin", "épicerie", "epicerie", "supérette", "retail", "négoce"],
    ),
    (
        "technologie",
        &["technology", "tech", "informatique", "logiciel", "software", "digital", "saas", "web"],
    ),
    (
        "services",
        &["conseil", "consulting", "agence", "cabinet", "nettoyage", "service"],
    ),
    (
        "btp",
        &["construction", "bâtiment", "batiment", "plomberie", "électricité", "maçonnerie", "rénovation"],
    ),
    (
        "santé",
        &["sante", "pharmacie", "clinique", "médical", "medical", "optique", "paramédical"],
    ),
    (
        "hôtellerie",
        &["hotellerie", "hôtel", "hotel", "gîte", "camping", "chambre d'hôtes"],
    ),
    (
        "industrie",
        &["usine", "fabrication", "production", "manufacturing", "atelier"],
    ),
    (
        "transport",
        &["logistique", "livraison", "taxi", "déménagement", "fret"],
    ),
];

/// How two free-text sectors relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorAffinity {
    Identical,
    /// Different wording, same canonical family
    Related(&'static str),
    Unrelated,
}

/// Normalize a sector for comparison
#[inline]
pub fn normalize_sector(sector: &str) -> String {
    sector.trim().to_lowercase()
}

/// Case-insensitive, trimmed equality
#[inline]
pub fn same_sector(a: &str, b: &str) -> bool {
    normalize_sector(a) == normalize_sector(b)
}

/// Split a sector into lowercase words
fn sector_words(sector: &str) -> Vec<String> {
    sector
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word equality, tolerating a plural "s" or "x"
#[inline]
fn word_matches(word: &str, fragment: &str) -> bool {
    match word.strip_prefix(fragment) {
        Some(rest) => rest.is_empty() || rest == "s" || rest == "x",
        None => false,
    }
}

/// True when the words of `fragment` appear consecutively in `words`
fn contains_phrase(words: &[String], fragment: &str) -> bool {
    let phrase = sector_words(fragment);
    if phrase.is_empty() || phrase.len() > words.len() {
        return false;
    }

    words
        .windows(phrase.len())
        .any(|window| window.iter().zip(&phrase).all(|(word, part)| word_matches(word, part)))
}

/// Every canonical family a free-text sector falls into, in table order
pub fn sector_families(sector: &str) -> Vec<&'static str> {
    let words = sector_words(sector);
    if words.is_empty() {
        return Vec::new();
    }

    SECTOR_FAMILIES
        .iter()
        .filter(|(key, fragments)| {
            contains_phrase(&words, key) || fragments.iter().any(|fragment| contains_phrase(&words, fragment))
        })
        .map(|(key, _)| *key)
        .collect()
}

/// First canonical family a free-text sector falls into, if any
pub fn sector_family(sector: &str) -> Option<&'static str> {
    sector_families(sector).into_iter().next()
}

/// Compare two sectors through the compatibility table
///
/// Sectors spanning several families ("Hôtel-restaurant") relate to any
/// sector sharing one of them.
pub fn sector_affinity(a: &str, b: &str) -> SectorAffinity {
    if same_sector(a, b) {
        return SectorAffinity::Identical;
    }

    let families_b = sector_families(b);
    sector_families(a)
        .into_iter()
        .find(|family| families_b.contains(family))
        .map_or(SectorAffinity::Unrelated, SectorAffinity::Related)
}
