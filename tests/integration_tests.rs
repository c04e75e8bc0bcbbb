// Integration tests for Smart Match

use serde_json::json;
use smart_match::core::{Matcher, INSUFFICIENT_DATA};
use smart_match::models::{Dimension, ListingRecord, MatchFilters, SearchCriteria, Searcher};

fn listing(id: &str, sector: Option<&str>, price: Option<f64>) -> ListingRecord {
    ListingRecord {
        id: Some(id.to_string()),
        title: Some(format!("Business {}", id)),
        sector: sector.map(str::to_string),
        asking_price: price,
        ..Default::default()
    }
}

fn tech_buyer() -> Searcher {
    Searcher::Criteria(SearchCriteria {
        id: Some("buyer-1".to_string()),
        selected_criteria: [Dimension::Budget, Dimension::Sector].into_iter().collect(),
        budget_max: Some(200_000.0),
        sectors: vec!["technology".to_string()],
        ..Default::default()
    })
}

#[test]
fn test_integration_end_to_end_matching() {
    let matcher = Matcher::with_default_weights();

    let candidates = vec![
        listing("a", Some("Technology"), Some(150_000.0)), // Perfect fit
        listing("b", Some("Technology"), Some(500_000.0)), // Over budget
        listing("c", Some("Retail"), Some(150_000.0)),     // Wrong sector
        listing("d", Some("technology"), None),            // No price published
    ];

    let filters = MatchFilters {
        min_score: Some(50.0),
        sector: Some("technology".to_string()),
        ..Default::default()
    };

    let outcome = matcher.find_matches(&tech_buyer(), candidates, &filters, 10);

    assert_eq!(outcome.total_candidates, 4);
    let ids: Vec<_> = outcome.matches.iter().filter_map(|m| m.listing.id.as_deref()).collect();
    assert_eq!(ids, vec!["a", "d", "b"]);

    assert_eq!(outcome.matches[0].score(), 100.0);
    assert_eq!(outcome.matches[1].score(), 100.0);
    // 150% over budget: 100 - 150 * 0.3 = 55 on the budget dimension, above the 30 floor
    assert_eq!(outcome.matches[2].score(), 77.5);

    // All matches should be sorted by score
    for i in 1..outcome.matches.len() {
        assert!(
            outcome.matches[i - 1].score() >= outcome.matches[i].score(),
            "Matches not sorted by score"
        );
    }
}

#[test]
fn test_scoring_is_deterministic() {
    let matcher = Matcher::with_default_weights();
    let candidate = listing("a", Some("Technology"), Some(180_000.0));

    let first = matcher.score(&tech_buyer(), &candidate);
    let second = matcher.score(&tech_buyer(), &candidate);

    assert_eq!(first, second);
}

#[test]
fn test_score_range() {
    let matcher = Matcher::with_default_weights();
    let searcher = Searcher::Listing(ListingRecord {
        id: Some("mine".to_string()),
        sector: Some("Restaurant".to_string()),
        asking_price: Some(120_000.0),
        location: Some("Lyon".to_string()),
        employee_count: Some(4),
        annual_revenue: Some(300_000.0),
        ..Default::default()
    });

    let candidates: Vec<ListingRecord> = (0..50)
        .map(|i| ListingRecord {
            id: Some(i.to_string()),
            sector: Some(if i % 2 == 0 { "Pizzeria" } else { "Restaurant" }.to_string()),
            asking_price: Some(50_000.0 + i as f64 * 10_000.0),
            location: Some("Lyon".to_string()),
            employee_count: Some(i % 8),
            annual_revenue: Some(250_000.0 + i as f64 * 5_000.0),
            ..Default::default()
        })
        .collect();

    for m in matcher.rank_matches(&searcher, candidates) {
        assert!(
            m.score() >= 0.0 && m.score() <= 100.0,
            "Score {} is out of range [0, 100]",
            m.score()
        );
    }
}

#[test]
fn test_missing_sector_is_omitted_from_breakdown() {
    let matcher = Matcher::with_default_weights();
    let result = matcher.score(&tech_buyer(), &listing("a", None, Some(150_000.0)));

    assert!(!result.breakdown.contains_key(&Dimension::Sector));
    assert_eq!(result.breakdown.get(&Dimension::Budget), Some(&100.0));
    assert_eq!(result.score, 100.0);
}

#[test]
fn test_rank_excludes_searcher_listing() {
    let matcher = Matcher::with_default_weights();
    let own = listing("mine", Some("Technology"), Some(100_000.0));
    let searcher = Searcher::Listing(own.clone());

    let ranked = matcher.rank_matches(
        &searcher,
        vec![own, listing("other", Some("Technology"), Some(100_000.0))],
    );

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].listing.id.as_deref(), Some("other"));
}

#[test]
fn test_equal_scores_keep_input_order() {
    let matcher = Matcher::with_default_weights();
    let candidates: Vec<ListingRecord> = ["first", "second", "third"]
        .iter()
        .map(|id| listing(id, Some("Technology"), Some(120_000.0)))
        .collect();

    let ranked = matcher.rank_matches(&tech_buyer(), candidates);

    let ids: Vec<_> = ranked.iter().filter_map(|m| m.listing.id.as_deref()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn test_budget_range_scores() {
    let matcher = Matcher::with_default_weights();
    let searcher = Searcher::Criteria(SearchCriteria {
        selected_criteria: [Dimension::Budget].into_iter().collect(),
        budget_min: Some(100_000.0),
        budget_max: Some(200_000.0),
        ..Default::default()
    });

    let inside = matcher.score(&searcher, &listing("a", None, Some(150_000.0)));
    assert_eq!(inside.score, 100.0);
    assert_eq!(inside.criteria_matched_count, 1);

    let above = matcher.score(&searcher, &listing("b", None, Some(250_000.0)));
    assert_eq!(above.score, 92.5);
    assert!(above.explanation[0].starts_with("✅"));
}

#[test]
fn test_peer_sector_case_insensitive() {
    let matcher = Matcher::with_default_weights();
    let searcher = Searcher::Listing(listing("mine", Some("Technology"), None));

    let result = matcher.score(&searcher, &listing("other", Some("technology"), None));

    assert_eq!(result.score, 30.0);
    assert_eq!(result.explanation.len(), 1);
    assert!(result.explanation[0].contains("Same sector"));
    assert!(result.explanation[0].contains("Technology"));
}

#[test]
fn test_empty_criteria_yield_insufficient_data() {
    let matcher = Matcher::with_default_weights();
    let result = matcher.score(
        &Searcher::Criteria(SearchCriteria::default()),
        &listing("a", Some("Technology"), Some(150_000.0)),
    );

    assert_eq!(result.score, 0.0);
    assert!(result.breakdown.is_empty());
    assert_eq!(result.explanation, vec![INSUFFICIENT_DATA.to_string()]);
    assert_eq!(result.criteria_matched_count, 0);
}

#[test]
fn test_lenient_json_input() {
    let matcher = Matcher::with_default_weights();

    let searcher: Searcher = serde_json::from_value(json!({
        "kind": "criteria",
        "selectedCriteria": ["budget", "sector"],
        "budgetMax": "200 000",
        "sectors": ["technology"]
    }))
    .unwrap();

    let garbage_price: ListingRecord = serde_json::from_value(json!({
        "id": "a",
        "askingPrice": "abc",
        "sector": "Technology"
    }))
    .unwrap();
    let spaced_price: ListingRecord = serde_json::from_value(json!({
        "id": "b",
        "asking_price": "150 000",
        "sector": "Technology"
    }))
    .unwrap();

    assert_eq!(garbage_price.asking_price, None);
    assert_eq!(spaced_price.asking_price, Some(150_000.0));

    let skipped = matcher.score(&searcher, &garbage_price);
    assert!(!skipped.breakdown.contains_key(&Dimension::Budget));
    assert_eq!(skipped.score, 100.0);

    let scored = matcher.score(&searcher, &spaced_price);
    assert_eq!(scored.breakdown.get(&Dimension::Budget), Some(&100.0));
}

#[test]
fn test_max_limit_enforcement() {
    let matcher = Matcher::with_default_weights();
    let candidates: Vec<ListingRecord> = (0..50)
        .map(|i| listing(&i.to_string(), Some("Technology"), Some(100_000.0 + i as f64 * 1_000.0)))
        .collect();

    let outcome = matcher.find_matches(&tech_buyer(), candidates, &MatchFilters::default(), 10);

    assert_eq!(outcome.total_candidates, 50);
    assert!(outcome.matches.len() <= 10, "Should not exceed limit of 10");
}
