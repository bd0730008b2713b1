use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data_source::FootballData;
use crate::types::{
    Fixture, LineupAnnouncement, PlayerIdentity, PlayerSeasonStats, Position, TeamLineup,
};

const FAKE_LEAGUE_ID: u32 = 39;
const FAKE_SEASON: u16 = 2026;

const CLUBS: &[(u32, &str)] = &[
    (42, "Arsenal"),
    (50, "Manchester City"),
    (40, "Liverpool"),
    (49, "Chelsea"),
];

const SQUAD_SHAPE: &[(Position, usize)] = &[
    (Position::Goalkeeper, 2),
    (Position::Defender, 5),
    (Position::Midfielder, 5),
    (Position::Attacker, 4),
];

/// In-memory provider. `seeded` builds a reproducible matchday; the builder
/// methods let tests shape every answer, including failures and latency.
#[derive(Debug, Clone, Default)]
pub struct FakeFeed {
    configured: bool,
    fixtures: Vec<Fixture>,
    squads: HashMap<u32, Vec<PlayerIdentity>>,
    stats: HashMap<u32, PlayerSeasonStats>,
    standings: HashMap<(u32, u32), u32>,
    lineups: HashMap<u32, LineupAnnouncement>,
    failing_players: HashSet<u32>,
    failing_lineups: HashSet<u32>,
    slow_players: HashMap<u32, Duration>,
    // Shared across clones so a test can keep a handle on the feed it hands out.
    standings_calls: Arc<AtomicUsize>,
    status_updates: Arc<Mutex<HashMap<u32, String>>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self {
            configured: true,
            ..Default::default()
        }
    }

    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Two fixtures: the first inside the lineup window with lineups out, the
    /// second three hours away. Kickoffs never spill past `now`'s UTC date.
    pub fn seeded(seed: u64, now: DateTime<Utc>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut feed = Self::new();

        let end_of_day = now
            .date_naive()
            .and_hms_opt(23, 59, 0)
            .map(|t| t.and_utc())
            .unwrap_or(now)
            .max(now);
        let kickoffs = [
            (now + ChronoDuration::minutes(30)).min(end_of_day),
            (now + ChronoDuration::hours(3)).min(end_of_day),
        ];
        for (idx, pair) in CLUBS.chunks(2).enumerate() {
            let (home_id, home) = pair[0];
            let (away_id, away) = pair[1];
            let fixture_id = 9000 + idx as u32;
            feed = feed.with_fixture(Fixture {
                id: fixture_id,
                kickoff: kickoffs[idx % kickoffs.len()].to_rfc3339(),
                league_id: FAKE_LEAGUE_ID,
                season: FAKE_SEASON,
                home_team_id: home_id,
                home_team: home.to_string(),
                away_team_id: away_id,
                away_team: away.to_string(),
                status: "NS".to_string(),
            });
        }

        let mut ranks: Vec<u32> = (1..=20).collect();
        for (team_id, club) in CLUBS {
            let pick = rng.gen_range(0..ranks.len());
            feed = feed.with_standing(FAKE_LEAGUE_ID, *team_id, ranks.remove(pick));

            let mut squad = Vec::new();
            let mut shirt = 1u32;
            for (position, count) in SQUAD_SHAPE {
                for _ in 0..*count {
                    let id = team_id * 100 + shirt;
                    let name = format!("{club} #{shirt}");
                    squad.push(PlayerIdentity {
                        id,
                        name: name.clone(),
                        position: format!("{position:?}"),
                        team_id: *team_id,
                    });
                    feed = feed.with_stats(random_stats(&mut rng, id, &name, *position));
                    shirt += 1;
                }
            }
            feed = feed.with_squad(*team_id, squad);
        }

        if let Some(first) = feed.fixtures.first().cloned() {
            let starters = |team_id: u32| -> Vec<u32> {
                feed.squads
                    .get(&team_id)
                    .map(|s| s.iter().skip(1).take(11).map(|p| p.id).collect())
                    .unwrap_or_default()
            };
            let lineup = LineupAnnouncement {
                fixture_id: first.id,
                home: TeamLineup {
                    team_id: first.home_team_id,
                    starters: starters(first.home_team_id),
                },
                away: TeamLineup {
                    team_id: first.away_team_id,
                    starters: starters(first.away_team_id),
                },
            };
            feed = feed.with_lineup(lineup);
        }

        feed
    }

    pub fn with_fixture(mut self, fixture: Fixture) -> Self {
        self.fixtures.push(fixture);
        self
    }

    pub fn with_squad(mut self, team_id: u32, players: Vec<PlayerIdentity>) -> Self {
        self.squads.insert(team_id, players);
        self
    }

    pub fn with_stats(mut self, stats: PlayerSeasonStats) -> Self {
        self.stats.insert(stats.player_id, stats);
        self
    }

    pub fn with_standing(mut self, league_id: u32, team_id: u32, rank: u32) -> Self {
        self.standings.insert((league_id, team_id), rank);
        self
    }

    pub fn with_lineup(mut self, lineup: LineupAnnouncement) -> Self {
        self.lineups.insert(lineup.fixture_id, lineup);
        self
    }

    pub fn failing_player(mut self, player_id: u32) -> Self {
        self.failing_players.insert(player_id);
        self
    }

    pub fn failing_lineups(mut self, fixture_id: u32) -> Self {
        self.failing_lineups.insert(fixture_id);
        self
    }

    pub fn slow_player(mut self, player_id: u32, delay: Duration) -> Self {
        self.slow_players.insert(player_id, delay);
        self
    }

    /// Moves a fixture to a new status code, as a live provider would.
    pub fn set_status(&self, fixture_id: u32, status: &str) {
        self.status_updates
            .lock()
            .expect("fake status lock poisoned")
            .insert(fixture_id, status.to_string());
    }

    fn current(&self, fixture: &Fixture) -> Fixture {
        let mut fixture = fixture.clone();
        if let Some(status) = self
            .status_updates
            .lock()
            .expect("fake status lock poisoned")
            .get(&fixture.id)
        {
            fixture.status = status.clone();
        }
        fixture
    }

    /// League tables served so far.
    pub fn standings_calls(&self) -> usize {
        self.standings_calls.load(Ordering::Relaxed)
    }
}

fn random_stats(rng: &mut StdRng, id: u32, name: &str, position: Position) -> PlayerSeasonStats {
    let appearances = rng.gen_range(6..=30) as f64;
    let (shots_per_game, conversion, passes_per_game) = match position {
        Position::Goalkeeper => (0.0, 0.0, 25.0),
        Position::Defender => (0.5, 0.06, 45.0),
        Position::Midfielder => (1.3, 0.10, 50.0),
        Position::Attacker => (2.8, 0.16, 22.0),
    };
    let shots = (appearances * shots_per_game * rng.gen_range(0.5..1.5)).round();
    let shots_on = (shots * rng.gen_range(0.25..0.55)).round();
    let goals = (shots * conversion * rng.gen_range(0.4..1.6)).round();
    PlayerSeasonStats {
        player_id: id,
        name: name.to_string(),
        position: Some(position),
        appearances: Some(appearances),
        minutes: Some((appearances * rng.gen_range(55.0..90.0)).round()),
        rating: Some((rng.gen_range(6.2..7.9_f64) * 100.0).round() / 100.0),
        shots_total: Some(shots),
        shots_on: Some(shots_on),
        passes_total: Some((appearances * passes_per_game * rng.gen_range(0.7..1.3)).round()),
        passes_accuracy: Some(rng.gen_range(68.0..92.0_f64).round()),
        lineups: Some((appearances * rng.gen_range(0.4..1.0)).round()),
        goals: Some(goals),
    }
}

impl FootballData for FakeFeed {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn get_fixtures(&self, league_ids: &[u32], date: NaiveDate) -> Result<Vec<Fixture>> {
        Ok(self
            .fixtures
            .iter()
            .filter(|f| league_ids.is_empty() || league_ids.contains(&f.league_id))
            .filter(|f| f.kickoff_utc().is_none_or(|k| k.date_naive() == date))
            .map(|f| self.current(f))
            .collect())
    }

    fn get_fixture(&self, fixture_id: u32) -> Result<Option<Fixture>> {
        Ok(self
            .fixtures
            .iter()
            .find(|f| f.id == fixture_id)
            .map(|f| self.current(f)))
    }

    fn get_lineups(&self, fixture_id: u32) -> Result<Option<LineupAnnouncement>> {
        if self.failing_lineups.contains(&fixture_id) {
            return Err(anyhow!("lineups {fixture_id}: connection reset"));
        }
        Ok(self.lineups.get(&fixture_id).cloned())
    }

    fn get_player_season_stats(
        &self,
        player_id: u32,
        _league_id: u32,
        _season: u16,
    ) -> Result<Option<PlayerSeasonStats>> {
        if let Some(delay) = self.slow_players.get(&player_id) {
            thread::sleep(*delay);
        }
        if self.failing_players.contains(&player_id) {
            return Err(anyhow!("player {player_id}: http 503"));
        }
        Ok(self.stats.get(&player_id).cloned())
    }

    fn get_standings(&self, league_id: u32, _season: u16) -> Result<HashMap<u32, u32>> {
        self.standings_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .standings
            .iter()
            .filter(|((league, _), _)| *league == league_id)
            .map(|((_, team), rank)| (*team, *rank))
            .collect())
    }

    fn get_squad(&self, team_id: u32) -> Result<Vec<PlayerIdentity>> {
        Ok(self.squads.get(&team_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn late_evening_matchday_stays_on_its_date() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 22, 40, 0).unwrap();
        let feed = FakeFeed::seeded(7, now);
        let today = feed.get_fixtures(&[FAKE_LEAGUE_ID], now.date_naive()).unwrap();
        assert_eq!(today.len(), 2);
        assert!(today.iter().all(|f| f.kickoff_utc().is_some_and(|k| k >= now)));
    }

    #[test]
    fn standings_are_one_table_per_league() {
        let feed = FakeFeed::new()
            .with_standing(39, 1, 4)
            .with_standing(39, 2, 9)
            .with_standing(140, 3, 1);
        let table = feed.get_standings(39, 2026).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&2), Some(&9));
        assert_eq!(table.get(&3), None);
        assert_eq!(feed.get_standings(140, 2026).unwrap().get(&3), Some(&1));
        assert_eq!(feed.get_team_standing(39, 2026, 2).unwrap(), Some(9));
        assert_eq!(feed.get_team_standing(39, 2026, 3).unwrap(), None);
        assert_eq!(feed.standings_calls(), 4);
    }
}
