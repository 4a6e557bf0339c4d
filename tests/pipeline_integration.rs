//! Integration tests for the parse side of the pipeline.
//!
//! Saved box-score pages go through locate → extract → normalize →
//! reshape without touching the network.

use boxscore_core::normalize::normalize_rows;
use boxscore_core::reshape::{dedupe_linescores, linescores_to_wide, to_long, to_wide};
use boxscore_core::table::{TableIdentity, extract_linescore, extract_stat_rows, locate};
use boxscore_core::{GameEntry, Side, StatKey, TypedValue, build_features};

const MODERN: &str = include_str!("fixtures/boxscore_modern.html");
const LEGACY: &str = include_str!("fixtures/boxscore_legacy.html");

#[test]
fn test_modern_page_totals_to_wide() {
    let grid = locate(MODERN, &TableIdentity::team_stats()).expect("team stats should be found");
    assert_eq!(grid.id.as_deref(), Some("team_stats"));

    let raw = extract_stat_rows(&grid, "201809100det", "New York Jets", "Detroit Lions");
    assert_eq!(raw.len(), 7);
    assert_eq!(raw[0].stat, "First Downs");
    assert_eq!(raw[0].away_header, "NYJ");
    assert_eq!(raw[0].home_header, "DET");

    let normalized = normalize_rows(&raw);
    let wide = to_wide(&normalized);
    assert_eq!(wide.len(), 1);

    let game = &wide[0];
    assert_eq!(game.game_id, "201809100det");
    assert_eq!(game.away_team, "New York Jets");
    assert_eq!(game.get("away_first_downs"), Some(25));
    assert_eq!(game.get("home_total_yards"), Some(413));
    assert_eq!(game.get("home_turnovers"), Some(5));
    assert_eq!(game.get("away_third_down_conv_made"), Some(5));
    assert_eq!(game.get("away_third_down_conv_att"), Some(13));
    assert_eq!(game.get("away_time_of_possession_seconds"), Some(1933));
    assert_eq!(game.get("home_time_of_possession_seconds"), Some(1667));

    // Unknown label: slug key, shape inferred from its values.
    assert_eq!(game.get("away_sacked_yards_made"), Some(1));
    assert_eq!(game.get("home_sacked_yards_att"), Some(21));

    // Known integer stat with a non-integer value degrades to empty.
    assert!(game.columns.contains_key("away_penalties_yards"));
    assert_eq!(game.get("away_penalties_yards"), None);
}

#[test]
fn test_modern_page_linescore_by_attributes() {
    let grid = locate(MODERN, &TableIdentity::linescore()).expect("linescore should be found");
    let linescore = extract_linescore(&grid, "201809100DET").unwrap();

    assert_eq!(linescore.game_id, "201809100det");
    assert_eq!(linescore.away.team, "New York Jets");
    assert_eq!(linescore.home.team, "Detroit Lions");
    assert_eq!(linescore.away.periods.q3, Some(14));
    assert_eq!(linescore.away.periods.total, Some(48));
    assert_eq!(linescore.home.periods.total, Some(17));
    assert_eq!(linescore.home.periods.ot, None);
}

#[test]
fn test_legacy_page_found_by_content() {
    let grid = locate(LEGACY, &TableIdentity::team_stats()).expect("heuristic should match");
    assert_eq!(grid.id, None);

    let raw = extract_stat_rows(&grid, "199101270buf", "Buffalo Bills", "New York Giants");
    let stats: Vec<&str> = raw.iter().map(|r| r.stat.as_str()).collect();
    assert_eq!(stats, ["First Downs", "Total Yds", "Turnovers"]);

    let normalized = normalize_rows(&raw);
    assert_eq!(normalized[1].stat_norm, StatKey::TotalYards);
    assert_eq!(normalized[2].value(Side::Away), &TypedValue::Integer(None));
    assert_eq!(normalized[2].value(Side::Home), &TypedValue::Integer(Some(2)));
}

#[test]
fn test_legacy_linescore_positional_with_overtime() {
    let grid = locate(LEGACY, &TableIdentity::linescore()).unwrap();
    let linescore = extract_linescore(&grid, "199101270buf").unwrap();

    assert_eq!(linescore.away.team, "Buffalo Bills");
    assert_eq!(linescore.away.periods.q4, Some(7));
    assert_eq!(linescore.away.periods.ot, Some(3));
    assert_eq!(linescore.away.periods.total, Some(20));
    assert_eq!(linescore.home.team, "New York Giants");
    assert_eq!(linescore.home.periods.ot, Some(0));
    assert_eq!(linescore.home.periods.total, Some(17));
}

#[test]
fn test_page_without_tables_yields_nothing() {
    let page = "<html><body><p>Game postponed</p></body></html>";
    assert!(locate(page, &TableIdentity::team_stats()).is_none());
    assert!(locate(page, &TableIdentity::linescore()).is_none());
}

#[test]
fn test_wide_and_long_agree_across_games() {
    let mut raw = extract_stat_rows(
        &locate(MODERN, &TableIdentity::team_stats()).unwrap(),
        "201809100det",
        "New York Jets",
        "Detroit Lions",
    );
    raw.extend(extract_stat_rows(
        &locate(LEGACY, &TableIdentity::team_stats()).unwrap(),
        "199101270buf",
        "Buffalo Bills",
        "New York Giants",
    ));

    let wide = to_wide(&normalize_rows(&raw));
    assert_eq!(wide.len(), 2);
    // Both games carry the same column set.
    assert_eq!(wide[0].columns.keys().collect::<Vec<_>>(), wide[1].columns.keys().collect::<Vec<_>>());
    assert_eq!(wide[1].get("away_third_down_conv_made"), None);

    let long = to_long(&wide);
    let rewide = to_wide(&long);
    assert_eq!(rewide, wide);
}

#[test]
fn test_linescores_feed_features() {
    let modern = extract_linescore(
        &locate(MODERN, &TableIdentity::linescore()).unwrap(),
        "201809100det",
    )
    .unwrap();
    let legacy = extract_linescore(
        &locate(LEGACY, &TableIdentity::linescore()).unwrap(),
        "199101270buf",
    )
    .unwrap();

    let records: Vec<_> = [&modern, &legacy, &modern]
        .into_iter()
        .flat_map(|ls| ls.to_records())
        .collect();
    let tidy = dedupe_linescores(&records);
    assert_eq!(tidy.len(), 4);

    let linescore_wide = linescores_to_wide(&tidy);
    let index = vec![
        GameEntry {
            game_id: "201809100DET".to_string(),
            away: "NYJ".to_string(),
            home: "DET".to_string(),
            ..GameEntry::default()
        },
        GameEntry {
            game_id: "199101270buf".to_string(),
            ..GameEntry::default()
        },
    ];

    let features = build_features(&index, &linescore_wide, &[]);
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].point_diff, Some(-31));
    assert_eq!(features[0].winner.as_deref(), Some("NYJ"));
    assert_eq!(features[0].loser.as_deref(), Some("DET"));
    assert_eq!(features[1].point_diff, Some(-3));
    assert_eq!(features[1].winner.as_deref(), Some("Buffalo Bills"));
}
