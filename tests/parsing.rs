use std::fs;
use std::path::PathBuf;

use scorer_forecast::api_football::{
    parse_fixtures_json, parse_lineups_json, parse_player_stats_json, parse_squad_json,
    parse_standings_json,
};
use scorer_forecast::types::Position;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_fixtures_and_skips_malformed_rows() {
    let rows = parse_fixtures_json(&read_fixture("fixtures.json")).expect("fixture should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, 1208021);
    assert_eq!(rows[0].league_id, 39);
    assert_eq!(rows[0].season, 2026);
    assert_eq!(rows[0].home_team, "Manchester City");
    assert_eq!(rows[0].away_team_id, 42);
    assert!(rows[0].kickoff_utc().is_some());
    assert!(!rows[0].is_finished());
    assert!(rows[1].is_finished());
}

#[test]
fn parses_lineups_home_first() {
    let lineup = parse_lineups_json(1208021, &read_fixture("lineups.json"))
        .expect("fixture should parse")
        .expect("lineups should be present");
    assert_eq!(lineup.home.team_id, 50);
    assert_eq!(lineup.away.team_id, 42);
    assert!(lineup.is_starter(50, 1100));
    assert!(!lineup.is_starter(50, 19130));
    assert!(lineup.is_starter(42, 1460));
}

#[test]
fn unpublished_lineups_are_none() {
    let raw = r#"{"get":"fixtures/lineups","errors":[],"results":0,"response":[]}"#;
    assert!(parse_lineups_json(1, raw).expect("empty should parse").is_none());
}

#[test]
fn player_stats_pick_the_requested_league() {
    let stats = parse_player_stats_json(&read_fixture("player_stats.json"), 39)
        .expect("fixture should parse")
        .expect("player should be present");
    assert_eq!(stats.player_id, 1100);
    assert_eq!(stats.position, Some(Position::Attacker));
    assert_eq!(stats.appearances, Some(20.0));
    assert_eq!(stats.rating, Some(7.35));
    assert_eq!(stats.shots_total, Some(60.0));
    assert_eq!(stats.goals, Some(14.0));
    assert_eq!(stats.passes_accuracy, Some(74.0));
    assert_eq!(stats.lineups, Some(19.0));
}

#[test]
fn player_stats_fall_back_to_first_block() {
    let stats = parse_player_stats_json(&read_fixture("player_stats.json"), 135)
        .expect("fixture should parse")
        .expect("player should be present");
    assert_eq!(stats.appearances, Some(3.0));
}

#[test]
fn standings_map_team_to_rank() {
    let ranks = parse_standings_json(&read_fixture("standings.json")).expect("fixture should parse");
    assert_eq!(ranks.get(&42), Some(&1));
    assert_eq!(ranks.get(&50), Some(&2));
    assert_eq!(ranks.get(&999), None);
}

#[test]
fn squad_skips_players_without_id() {
    let squad = parse_squad_json(&read_fixture("squad.json")).expect("fixture should parse");
    assert_eq!(squad.len(), 3);
    assert!(squad.iter().all(|p| p.team_id == 50));
    assert_eq!(squad[2].position, "Attacker");
}

#[test]
fn null_payloads_are_empty() {
    assert!(parse_fixtures_json("null").expect("null should parse").is_empty());
    assert!(parse_squad_json("").expect("empty should parse").is_empty());
    assert!(parse_player_stats_json("null", 39).expect("null should parse").is_none());
}

#[test]
fn provider_errors_are_reported() {
    let raw = r#"{"errors":{"requests":"You have reached the request limit for the day"},"response":[]}"#;
    assert!(parse_fixtures_json(raw).is_err());
}
