use std::collections::BTreeMap;

use scorer_forecast::confidence::classify;
use scorer_forecast::ensemble::PredictorMode;
use scorer_forecast::ranking::{merge_ranked, rank};
use scorer_forecast::types::{PredictionResult, TeamSide};

fn pred(player_id: u32, probability: f64) -> PredictionResult {
    PredictionResult {
        player_id,
        player_name: format!("P{player_id}"),
        team: "H".to_string(),
        opponent: "A".to_string(),
        fixture_id: 1,
        match_label: "H vs A".to_string(),
        kickoff: "2026-10-18T14:00:00+00:00".to_string(),
        side: TeamSide::Home,
        probability,
        confidence: classify(probability),
        sub_scores: BTreeMap::new(),
        is_starter_confirmed: false,
        mode: PredictorMode::Heuristic,
    }
}

fn ids(rows: &[PredictionResult]) -> Vec<u32> {
    rows.iter().map(|r| r.player_id).collect()
}

#[test]
fn sorts_descending_and_truncates() {
    let input = vec![pred(1, 0.41), pred(2, 0.93), pred(3, 0.77), pred(4, 0.85)];
    let out = rank(&input, 3);
    assert_eq!(ids(&out), vec![2, 4, 3]);
    // Input untouched.
    assert_eq!(ids(&input), vec![1, 2, 3, 4]);
}

#[test]
fn ties_keep_insertion_order() {
    let input = vec![pred(5, 0.95), pred(6, 0.80), pred(7, 0.95), pred(8, 0.95)];
    assert_eq!(ids(&rank(&input, 10)), vec![5, 7, 8, 6]);
}

#[test]
fn length_is_min_of_limit_and_input() {
    let input: Vec<PredictionResult> = (0..7).map(|i| pred(i, i as f64 / 10.0)).collect();
    for limit in [1, 5, 7, 30] {
        let out = rank(&input, limit);
        assert_eq!(out.len(), limit.min(input.len()));
        assert!(out.windows(2).all(|w| w[0].probability >= w[1].probability));
    }
}

#[test]
fn empty_input_yields_empty_output() {
    assert!(rank(&[], 10).is_empty());
    assert!(merge_ranked(Vec::<Vec<PredictionResult>>::new(), 5).is_empty());
}

#[test]
fn nan_probabilities_sink_to_the_bottom() {
    let input = vec![pred(1, f64::NAN), pred(2, 0.5)];
    assert_eq!(ids(&rank(&input, 2)), vec![2, 1]);
}

#[test]
fn merged_batches_rank_across_fixtures() {
    let a = vec![pred(1, 0.6), pred(2, 0.9)];
    let b = vec![pred(3, 0.9), pred(4, 0.7)];
    assert_eq!(ids(&merge_ranked(vec![a, b], 3)), vec![2, 3, 4]);
}
