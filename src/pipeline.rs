use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::confidence::classify;
use crate::data_source::FootballData;
use crate::ensemble::{EnsemblePredictor, PredictorMode};
use crate::error::{PredictError, PredictResult, parse_fixture_id};
use crate::features::{self, DEFAULT_STANDING, FeatureSchema};
use crate::lineup_gate::{self, LineupPhase};
use crate::model_registry::ModelRegistry;
use crate::ranking::merge_ranked;
use crate::types::{
    Fixture, LineupAnnouncement, MatchContext, PlayerIdentity, PlayerSeasonStats, Position,
    PredictionResult, StarterStatus, TeamSide,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub models_loaded: bool,
    pub predictor_mode: PredictorMode,
    pub data_provider: String,
    pub api_key_configured: bool,
    pub feature_schema: &'static str,
}

#[derive(Debug, Clone)]
struct CachedLineup {
    lineup: LineupAnnouncement,
    kickoff: DateTime<Utc>,
}

type LineupCache = Mutex<HashMap<u32, CachedLineup>>;

/// Everything fetched once per fixture before its players are scored.
#[derive(Debug)]
struct FixturePlan {
    fixture: Fixture,
    phase: LineupPhase,
    lineup: Option<LineupAnnouncement>,
    home_rank: u32,
    away_rank: u32,
    players: Vec<(TeamSide, PlayerIdentity)>,
}

impl FixturePlan {
    fn context(&self, side: TeamSide) -> MatchContext {
        match side {
            TeamSide::Home => MatchContext {
                team_position: self.home_rank,
                opp_position: self.away_rank,
            },
            TeamSide::Away => MatchContext {
                team_position: self.away_rank,
                opp_position: self.home_rank,
            },
        }
    }
}

pub struct ScorerPipeline {
    data: Arc<dyn FootballData>,
    predictor: Arc<EnsemblePredictor>,
    league_ids: Vec<u32>,
    request_timeout: Duration,
    pool: Option<rayon::ThreadPool>,
    // Lineups seen inside the window, reused once the window has closed.
    lineup_cache: Arc<LineupCache>,
}

impl ScorerPipeline {
    pub fn new(data: Arc<dyn FootballData>, registry: ModelRegistry, cfg: &PipelineConfig) -> Self {
        let predictor = EnsemblePredictor::new(registry);
        info!(
            provider = data.name(),
            configured = data.is_configured(),
            mode = ?predictor.mode(),
            "scorer pipeline ready"
        );
        Self {
            data,
            predictor: Arc::new(predictor),
            league_ids: cfg.league_ids.clone(),
            request_timeout: cfg.request_timeout,
            pool: build_fetch_pool(cfg.fetch_parallelism),
            lineup_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn health(&self) -> HealthStatus {
        let models_loaded = self.predictor.mode() == PredictorMode::Ensemble;
        let api_key_configured = self.data.is_configured();
        HealthStatus {
            status: if models_loaded && api_key_configured {
                "ok"
            } else {
                "degraded"
            },
            models_loaded,
            predictor_mode: self.predictor.mode(),
            data_provider: self.data.name().to_string(),
            api_key_configured,
            feature_schema: FeatureSchema::V20.label(),
        }
    }

    /// Score one caller-described player, no provider involved.
    pub fn predict_player(
        &self,
        stats: &PlayerSeasonStats,
        side: TeamSide,
        starter: StarterStatus,
        context: MatchContext,
    ) -> PredictionResult {
        evaluate(&self.predictor, stats, side, starter, context, None)
    }

    /// Ranked scorers for one fixture, identified by its provider id.
    pub fn predict_fixture(&self, fixture_id: &str, limit: usize) -> PredictResult<Vec<PredictionResult>> {
        let id = parse_fixture_id(fixture_id)?;
        self.predict_fixture_at(id, limit, Utc::now())
    }

    pub fn predict_fixture_at(
        &self,
        fixture_id: u32,
        limit: usize,
        now: DateTime<Utc>,
    ) -> PredictResult<Vec<PredictionResult>> {
        check_limit(limit)?;
        let deadline = Instant::now() + self.request_timeout;
        if !self.data.is_configured() {
            warn!("data provider not configured, returning no predictions");
            return Ok(Vec::new());
        }
        let fixture = match self.data.get_fixture(fixture_id) {
            Ok(Some(fixture)) => fixture,
            Ok(None) => return Err(PredictError::FixtureNotFound(fixture_id)),
            Err(err) => {
                warn!(fixture_id, "fixture fetch failed: {err:#}");
                return Ok(Vec::new());
            }
        };
        self.evict_lineups(std::slice::from_ref(&fixture), now);
        let batches = self.score_fixtures(vec![fixture], now, deadline);
        Ok(merge_ranked(batches, limit))
    }

    /// Ranked scorers across today's fixtures in the configured leagues.
    pub fn predict_today(&self, limit: usize) -> PredictResult<Vec<PredictionResult>> {
        let now = Utc::now();
        self.predict_day(now.date_naive(), limit, now)
    }

    pub fn predict_day(
        &self,
        date: NaiveDate,
        limit: usize,
        now: DateTime<Utc>,
    ) -> PredictResult<Vec<PredictionResult>> {
        check_limit(limit)?;
        let deadline = Instant::now() + self.request_timeout;
        if !self.data.is_configured() {
            warn!("data provider not configured, returning no predictions");
            return Ok(Vec::new());
        }
        let fixtures = match self.data.get_fixtures(&self.league_ids, date) {
            Ok(fixtures) => fixtures,
            Err(err) => {
                warn!(%date, "fixtures fetch failed: {err:#}");
                return Ok(Vec::new());
            }
        };
        self.evict_lineups(&fixtures, now);
        let fixtures: Vec<Fixture> = fixtures.into_iter().filter(|f| !f.is_finished()).collect();
        info!(%date, fixtures = fixtures.len(), "scoring matchday");

        let batches = self.score_fixtures(fixtures, now, deadline);
        Ok(merge_ranked(batches, limit))
    }

    /// Lineups currently held for post-window reuse.
    pub fn cached_lineup_count(&self) -> usize {
        self.lineup_cache
            .lock()
            .expect("lineup cache lock poisoned")
            .len()
    }

    // Finished fixtures and long-gone kickoffs no longer need their lineup.
    fn evict_lineups(&self, fixtures: &[Fixture], now: DateTime<Utc>) {
        let mut cache = self.lineup_cache.lock().expect("lineup cache lock poisoned");
        let before = cache.len();
        cache.retain(|id, entry| {
            let finished = fixtures.iter().any(|f| f.id == *id && f.is_finished());
            !finished && !lineup_gate::lineup_expired(entry.kickoff, now)
        });
        if cache.len() < before {
            debug!(evicted = before - cache.len(), "lineup cache pruned");
        }
    }

    /// One batch per fixture, in fixture order. Work still running at the
    /// deadline is abandoned.
    fn score_fixtures(
        &self,
        fixtures: Vec<Fixture>,
        now: DateTime<Utc>,
        deadline: Instant,
    ) -> Vec<Vec<PredictionResult>> {
        let plan_jobs: Vec<_> = fixtures
            .into_iter()
            .map(|fixture| {
                let data = Arc::clone(&self.data);
                let cache = Arc::clone(&self.lineup_cache);
                move || plan_fixture(data.as_ref(), &cache, fixture, now, deadline)
            })
            .collect();
        let plans: Vec<Arc<FixturePlan>> = self
            .run_until(plan_jobs, deadline)
            .into_iter()
            .flatten()
            .map(Arc::new)
            .collect();

        let player_jobs: Vec<_> = plans
            .iter()
            .flat_map(|plan| (0..plan.players.len()).map(move |slot| (Arc::clone(plan), slot)))
            .map(|(plan, slot)| {
                let data = Arc::clone(&self.data);
                let predictor = Arc::clone(&self.predictor);
                move || score_player(data.as_ref(), &predictor, &plan, slot, deadline)
            })
            .collect();
        let mut slots = self.run_until(player_jobs, deadline).into_iter();

        plans
            .iter()
            .map(|plan| {
                let batch: Vec<PredictionResult> = slots
                    .by_ref()
                    .take(plan.players.len())
                    .flatten()
                    .flatten()
                    .collect();
                if batch.len() < plan.players.len() {
                    info!(
                        fixture = plan.fixture.id,
                        scored = batch.len(),
                        skipped = plan.players.len() - batch.len(),
                        "partial fixture result"
                    );
                }
                batch
            })
            .collect()
    }

    /// Runs every job on the fetch pool and collects results in job order.
    /// Slots still empty at the deadline stay `None`.
    fn run_until<T, F>(&self, jobs: Vec<F>, deadline: Instant) -> Vec<Option<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let total = jobs.len();
        let (tx, rx) = mpsc::channel();
        for (idx, job) in jobs.into_iter().enumerate() {
            let tx = tx.clone();
            let task = move || {
                let _ = tx.send((idx, job()));
            };
            if let Some(pool) = self.pool.as_ref() {
                pool.spawn(task);
            } else {
                std::thread::spawn(task);
            }
        }
        drop(tx);

        let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
        let mut received = 0;
        while received < total {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((idx, value)) => {
                    slots[idx] = Some(value);
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(pending = total - received, "request deadline reached");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        slots
    }
}

fn plan_fixture(
    data: &dyn FootballData,
    cache: &LineupCache,
    fixture: Fixture,
    now: DateTime<Utc>,
    deadline: Instant,
) -> FixturePlan {
    let phase = lineup_gate::phase(&fixture.kickoff, now);
    let lineup = if before(deadline) {
        lineup_for(data, cache, &fixture, phase)
    } else {
        None
    };

    let table = if before(deadline) {
        match data.get_standings(fixture.league_id, fixture.season) {
            Ok(table) => table,
            Err(err) => {
                warn!(fixture = fixture.id, "standings fetch failed: {err:#}");
                HashMap::new()
            }
        }
    } else {
        HashMap::new()
    };
    let rank_of = |team_id: u32| {
        table
            .get(&team_id)
            .copied()
            .filter(|rank| *rank > 0)
            .unwrap_or(DEFAULT_STANDING)
    };

    let mut players = Vec::new();
    for side in [TeamSide::Home, TeamSide::Away] {
        if !before(deadline) {
            debug!(fixture = fixture.id, "deadline reached before squads");
            break;
        }
        let (team_id, team_name) = fixture.team_for(side);
        match data.get_squad(team_id) {
            Ok(squad) => players.extend(squad.into_iter().map(|p| (side, p))),
            Err(err) => warn!(fixture = fixture.id, team = team_name, "squad fetch failed: {err:#}"),
        }
    }
    debug!(
        fixture = fixture.id,
        ?phase,
        lineup = lineup.is_some(),
        players = players.len(),
        "fixture planned"
    );

    FixturePlan {
        home_rank: rank_of(fixture.home_team_id),
        away_rank: rank_of(fixture.away_team_id),
        fixture,
        phase,
        lineup,
        players,
    }
}

fn lineup_for(
    data: &dyn FootballData,
    cache: &LineupCache,
    fixture: &Fixture,
    phase: LineupPhase,
) -> Option<LineupAnnouncement> {
    if phase.wants_fresh_lineup() {
        return match data.get_lineups(fixture.id) {
            Ok(Some(lineup)) => {
                if let Some(kickoff) = fixture.kickoff_utc() {
                    cache.lock().expect("lineup cache lock poisoned").insert(
                        fixture.id,
                        CachedLineup {
                            lineup: lineup.clone(),
                            kickoff,
                        },
                    );
                }
                Some(lineup)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(fixture = fixture.id, "lineup fetch failed: {err:#}");
                None
            }
        };
    }
    if phase == LineupPhase::PostWindow {
        return cache
            .lock()
            .expect("lineup cache lock poisoned")
            .get(&fixture.id)
            .map(|entry| entry.lineup.clone());
    }
    None
}

fn score_player(
    data: &dyn FootballData,
    predictor: &EnsemblePredictor,
    plan: &FixturePlan,
    slot: usize,
    deadline: Instant,
) -> Option<PredictionResult> {
    let (side, player) = plan.players.get(slot)?;
    if !before(deadline) {
        return None;
    }
    let fixture = &plan.fixture;
    let mut stats = match data.get_player_season_stats(player.id, fixture.league_id, fixture.season) {
        Ok(Some(mut stats)) => {
            if stats.position.is_none() {
                stats.position = Position::parse(&player.position);
            }
            stats
        }
        Ok(None) => PlayerSeasonStats {
            player_id: player.id,
            position: Position::parse(&player.position),
            ..Default::default()
        },
        Err(err) => {
            warn!(player = player.id, "season stats fetch failed: {err:#}");
            return None;
        }
    };
    if stats.name.trim().is_empty() {
        stats.name = player.name.clone();
    }

    let (team_id, _) = fixture.team_for(*side);
    let starter = lineup_gate::resolve_starter(plan.phase, plan.lineup.as_ref(), team_id, player.id);
    Some(evaluate(
        predictor,
        &stats,
        *side,
        starter,
        plan.context(*side),
        Some(fixture),
    ))
}

fn evaluate(
    predictor: &EnsemblePredictor,
    stats: &PlayerSeasonStats,
    side: TeamSide,
    starter: StarterStatus,
    context: MatchContext,
    fixture: Option<&Fixture>,
) -> PredictionResult {
    let vector = features::build(stats, side, starter, context);
    let prediction = predictor.predict(&vector);
    let (team, opponent, fixture_id, match_label, kickoff) = match fixture {
        Some(f) => (
            f.team_for(side).1.to_string(),
            f.team_for(side.opposite()).1.to_string(),
            f.id,
            f.label(),
            f.kickoff.clone(),
        ),
        None => Default::default(),
    };
    PredictionResult {
        player_id: stats.player_id,
        player_name: stats.name.clone(),
        team,
        opponent,
        fixture_id,
        match_label,
        kickoff,
        side,
        probability: prediction.probability,
        confidence: classify(prediction.probability),
        sub_scores: prediction.sub_scores,
        is_starter_confirmed: starter.is_confirmed(),
        mode: prediction.mode,
    }
}

fn before(deadline: Instant) -> bool {
    Instant::now() < deadline
}

fn check_limit(limit: usize) -> PredictResult<()> {
    if limit == 0 {
        return Err(PredictError::InvalidInput("limit must be at least 1".to_string()));
    }
    Ok(())
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|idx| format!("scorer-fetch-{idx}"))
        .build()
        .ok()
}
