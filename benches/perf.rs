use std::collections::BTreeMap;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use scorer_forecast::api_football::{parse_fixtures_json, parse_player_stats_json};
use scorer_forecast::confidence::classify;
use scorer_forecast::ensemble::{EnsemblePredictor, PredictorMode};
use scorer_forecast::features;
use scorer_forecast::model_registry::ModelRegistry;
use scorer_forecast::ranking::rank;
use scorer_forecast::types::{
    MatchContext, PlayerSeasonStats, Position, PredictionResult, StarterStatus, TeamSide,
};

fn sample_stats(id: u32) -> PlayerSeasonStats {
    PlayerSeasonStats {
        player_id: id,
        name: format!("Player {id}"),
        position: Some(Position::Attacker),
        appearances: Some(18.0),
        minutes: Some(1420.0),
        rating: Some(7.1),
        shots_total: Some(41.0),
        shots_on: Some(17.0),
        passes_total: Some(390.0),
        passes_accuracy: Some(77.0),
        lineups: Some(15.0),
        goals: Some(8.0),
    }
}

fn sample_prediction(id: u32) -> PredictionResult {
    // Spread probabilities without an RNG so runs stay comparable.
    let probability = 0.40 + ((id * 7919) % 550) as f64 / 1000.0;
    PredictionResult {
        player_id: id,
        player_name: format!("Player {id}"),
        team: "Test FC".to_string(),
        opponent: "Other FC".to_string(),
        fixture_id: 1,
        match_label: "Test FC vs Other FC".to_string(),
        kickoff: "2026-10-18T15:00:00+00:00".to_string(),
        side: TeamSide::Home,
        probability,
        confidence: classify(probability),
        sub_scores: BTreeMap::new(),
        is_starter_confirmed: id % 3 == 0,
        mode: PredictorMode::Heuristic,
    }
}

fn bench_feature_build(c: &mut Criterion) {
    let stats = sample_stats(1);
    let context = MatchContext {
        team_position: 4,
        opp_position: 13,
    };
    c.bench_function("feature_build", |b| {
        b.iter(|| {
            let v = features::build(
                black_box(&stats),
                TeamSide::Home,
                StarterStatus::Confirmed,
                black_box(context),
            );
            black_box(v.shot_conversion());
        })
    });
}

fn bench_heuristic_predict(c: &mut Criterion) {
    let predictor = EnsemblePredictor::new(ModelRegistry::empty());
    let vectors: Vec<_> = (0..64u32)
        .map(|id| {
            features::build(
                &sample_stats(id),
                TeamSide::Away,
                StarterStatus::Probable,
                MatchContext::default(),
            )
        })
        .collect();
    c.bench_function("heuristic_predict", |b| {
        b.iter(|| {
            for v in &vectors {
                black_box(predictor.predict(black_box(v)).probability);
            }
        })
    });
}

fn bench_rank(c: &mut Criterion) {
    let rows: Vec<PredictionResult> = (0..500).map(sample_prediction).collect();
    c.bench_function("rank_500", |b| {
        b.iter(|| {
            let top = rank(black_box(&rows), 10);
            black_box(top.len());
        })
    });
}

fn bench_fixtures_parse(c: &mut Criterion) {
    c.bench_function("fixtures_parse", |b| {
        b.iter(|| {
            let rows = parse_fixtures_json(black_box(FIXTURES_JSON)).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_player_stats_parse(c: &mut Criterion) {
    c.bench_function("player_stats_parse", |b| {
        b.iter(|| {
            let stats = parse_player_stats_json(black_box(PLAYER_STATS_JSON), 39).unwrap();
            black_box(stats.map(|s| s.player_id));
        })
    });
}

criterion_group!(
    perf,
    bench_feature_build,
    bench_heuristic_predict,
    bench_rank,
    bench_fixtures_parse,
    bench_player_stats_parse
);
criterion_main!(perf);

static FIXTURES_JSON: &str = include_str!("../tests/fixtures/fixtures.json");
static PLAYER_STATS_JSON: &str = include_str!("../tests/fixtures/player_stats.json");
