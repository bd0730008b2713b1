use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use scorer_forecast::api_football::ApiFootballClient;
use scorer_forecast::config::PipelineConfig;
use scorer_forecast::data_source::FootballData;
use scorer_forecast::error::parse_limit;
use scorer_forecast::fake_feed::FakeFeed;
use scorer_forecast::model_registry::ModelRegistry;
use scorer_forecast::pipeline::ScorerPipeline;
use scorer_forecast::types::{PlayerQuery, PredictionResult, PublicPrediction};

const USAGE: &str = "usage: scorer_forecast <today [limit] | fixture <id> [limit] | predict [json|-] | demo [limit] [seed] | health>";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cfg = PipelineConfig::from_env();
    let registry = ModelRegistry::load(cfg.model_dir.as_deref());

    let command = args.first().map(String::as_str).unwrap_or("today");
    match command {
        "health" => {
            let pipeline = live_pipeline(&cfg, registry);
            print_json(&pipeline.health())
        }
        "today" => {
            let limit = limit_arg(args.get(1), cfg.default_limit)?;
            let pipeline = live_pipeline(&cfg, registry);
            let ranked = pipeline.predict_today(limit)?;
            print_json(&public(&ranked))
        }
        "fixture" => {
            let Some(id) = args.get(1) else {
                bail!("{USAGE}");
            };
            let limit = limit_arg(args.get(2), cfg.default_limit)?;
            let pipeline = live_pipeline(&cfg, registry);
            let ranked = pipeline.predict_fixture(id, limit)?;
            print_json(&public(&ranked))
        }
        "predict" => {
            let raw = match args.get(1).map(String::as_str) {
                Some(raw) if raw != "-" => raw.to_string(),
                _ => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("read player json from stdin")?;
                    buf
                }
            };
            let query: PlayerQuery = serde_json::from_str(&raw).context("invalid player json")?;
            let pipeline = live_pipeline(&cfg, registry);
            let result =
                pipeline.predict_player(&query.stats, query.side(), query.starter(), query.context());
            print_json(&result.to_public())
        }
        "demo" => {
            let limit = limit_arg(args.get(1), cfg.default_limit)?;
            let seed = match args.get(2) {
                Some(raw) => raw.trim().parse::<u64>().context("seed must be an integer")?,
                None => 7,
            };
            let now = Utc::now();
            let feed: Arc<dyn FootballData> = Arc::new(FakeFeed::seeded(seed, now));
            let pipeline = ScorerPipeline::new(feed, registry, &cfg);
            let ranked = pipeline.predict_day(now.date_naive(), limit, now)?;
            print_json(&public(&ranked))
        }
        _ => bail!("{USAGE}"),
    }
}

fn live_pipeline(cfg: &PipelineConfig, registry: ModelRegistry) -> ScorerPipeline {
    let client: Arc<dyn FootballData> = Arc::new(ApiFootballClient::new(cfg));
    ScorerPipeline::new(client, registry, cfg)
}

fn limit_arg(raw: Option<&String>, default: usize) -> Result<usize> {
    match raw {
        Some(raw) => Ok(parse_limit(raw)?),
        None => Ok(default),
    }
}

fn public(ranked: &[PredictionResult]) -> Vec<PublicPrediction> {
    ranked.iter().map(PredictionResult::to_public).collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{out}");
    Ok(())
}
