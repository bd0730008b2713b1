use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::data_source::FootballData;
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::types::{
    Fixture, LineupAnnouncement, PlayerIdentity, PlayerSeasonStats, Position, TeamLineup,
};

const API_KEY_HEADER: &str = "x-apisports-key";

/// API-Football v3 provider. Without a key every call returns an empty answer.
#[derive(Clone)]
pub struct ApiFootballClient {
    api_key: Option<String>,
    base_url: String,
    cache_ttl: Duration,
}

impl std::fmt::Debug for ApiFootballClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiFootballClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl ApiFootballClient {
    pub fn new(cfg: &PipelineConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            cache_ttl: cfg.cache_ttl,
        }
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("API_FOOTBALL_KEY not configured"))?;
        let client = http_client()?;
        let qs = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let url = if qs.is_empty() {
            format!("{}/{path}", self.base_url)
        } else {
            format!("{}/{path}?{qs}", self.base_url)
        };
        debug!(%url, "api-football request");
        fetch_json_cached(client, &url, &[(API_KEY_HEADER, key)], self.cache_ttl)
            .with_context(|| format!("{path} request failed"))
    }
}

impl FootballData for ApiFootballClient {
    fn name(&self) -> &str {
        "api-football"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn get_fixtures(&self, league_ids: &[u32], date: NaiveDate) -> Result<Vec<Fixture>> {
        if !self.is_configured() {
            return Ok(Vec::new());
        }
        // One call for the whole day, filtered locally.
        let body = self.get("fixtures", &[("date", date.format("%Y-%m-%d").to_string())])?;
        let mut fixtures = parse_fixtures_json(&body)?;
        if !league_ids.is_empty() {
            fixtures.retain(|f| league_ids.contains(&f.league_id));
        }
        Ok(fixtures)
    }

    fn get_fixture(&self, fixture_id: u32) -> Result<Option<Fixture>> {
        if !self.is_configured() {
            return Ok(None);
        }
        let body = self.get("fixtures", &[("id", fixture_id.to_string())])?;
        Ok(parse_fixtures_json(&body)?
            .into_iter()
            .find(|f| f.id == fixture_id))
    }

    fn get_lineups(&self, fixture_id: u32) -> Result<Option<LineupAnnouncement>> {
        if !self.is_configured() {
            return Ok(None);
        }
        let body = self.get("fixtures/lineups", &[("fixture", fixture_id.to_string())])?;
        parse_lineups_json(fixture_id, &body)
    }

    fn get_player_season_stats(
        &self,
        player_id: u32,
        league_id: u32,
        season: u16,
    ) -> Result<Option<PlayerSeasonStats>> {
        if !self.is_configured() {
            return Ok(None);
        }
        let body = self.get(
            "players",
            &[
                ("id", player_id.to_string()),
                ("league", league_id.to_string()),
                ("season", season.to_string()),
            ],
        )?;
        parse_player_stats_json(&body, league_id)
    }

    fn get_standings(&self, league_id: u32, season: u16) -> Result<HashMap<u32, u32>> {
        if !self.is_configured() {
            return Ok(HashMap::new());
        }
        let body = self.get(
            "standings",
            &[("league", league_id.to_string()), ("season", season.to_string())],
        )?;
        parse_standings_json(&body)
    }

    fn get_squad(&self, team_id: u32) -> Result<Vec<PlayerIdentity>> {
        if !self.is_configured() {
            return Ok(Vec::new());
        }
        let body = self.get("players/squads", &[("team", team_id.to_string())])?;
        parse_squad_json(&body)
    }
}

/// Unwrap the `{ "errors": ..., "response": [...] }` envelope.
fn parse_envelope(raw: &str) -> Result<Vec<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid api-football json")?;
    if let Some(errors) = root.get("errors") {
        let has_errors = match errors {
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Null => false,
            _ => true,
        };
        if has_errors {
            return Err(anyhow!("api-football error: {errors}"));
        }
    }
    Ok(root
        .get("response")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default())
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    let items = parse_envelope(raw)?;
    Ok(items.iter().filter_map(parse_fixture).collect())
}

fn parse_fixture(item: &Value) -> Option<Fixture> {
    let fixture = item.get("fixture")?;
    let league = item.get("league")?;
    let teams = item.get("teams")?;
    let home = teams.get("home")?;
    let away = teams.get("away")?;
    Some(Fixture {
        id: as_u32(fixture.get("id"))?,
        kickoff: fixture
            .get("date")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        league_id: as_u32(league.get("id"))?,
        season: as_u32(league.get("season")).and_then(|s| u16::try_from(s).ok())?,
        home_team_id: as_u32(home.get("id"))?,
        home_team: as_string(home.get("name")).unwrap_or_default(),
        away_team_id: as_u32(away.get("id"))?,
        away_team: as_string(away.get("name")).unwrap_or_default(),
        status: fixture
            .get("status")
            .and_then(|s| as_string(s.get("short")))
            .unwrap_or_default(),
    })
}

/// The provider lists the home side first.
pub fn parse_lineups_json(fixture_id: u32, raw: &str) -> Result<Option<LineupAnnouncement>> {
    let items = parse_envelope(raw)?;
    let mut sides = items.iter().filter_map(parse_team_lineup);
    let (Some(home), Some(away)) = (sides.next(), sides.next()) else {
        return Ok(None);
    };
    let lineup = LineupAnnouncement {
        fixture_id,
        home,
        away,
    };
    if lineup.is_empty() {
        return Ok(None);
    }
    Ok(Some(lineup))
}

fn parse_team_lineup(item: &Value) -> Option<TeamLineup> {
    let team_id = as_u32(item.get("team").and_then(|t| t.get("id")))?;
    let starters = item
        .get("startXI")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|slot| as_u32(slot.get("player").and_then(|p| p.get("id"))))
                .collect()
        })
        .unwrap_or_default();
    Some(TeamLineup { team_id, starters })
}

/// Picks the statistics block for `league_id`, or the first block if the
/// player has none for that league.
pub fn parse_player_stats_json(raw: &str, league_id: u32) -> Result<Option<PlayerSeasonStats>> {
    let items = parse_envelope(raw)?;
    let Some(item) = items.first() else {
        return Ok(None);
    };
    let Some(player) = item.get("player") else {
        return Ok(None);
    };
    let Some(player_id) = as_u32(player.get("id")) else {
        return Ok(None);
    };
    let name = as_string(player.get("name")).unwrap_or_default();

    let blocks = item
        .get("statistics")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let block = blocks
        .iter()
        .find(|b| as_u32(b.get("league").and_then(|l| l.get("id"))) == Some(league_id))
        .or_else(|| blocks.first());

    let Some(block) = block else {
        return Ok(Some(PlayerSeasonStats {
            player_id,
            name,
            ..Default::default()
        }));
    };

    let games = block.get("games");
    let field = |group: &str, key: &str| as_f64(block.get(group).and_then(|g| g.get(key)));

    Ok(Some(PlayerSeasonStats {
        player_id,
        name,
        position: games
            .and_then(|g| g.get("position"))
            .and_then(|v| v.as_str())
            .and_then(Position::parse),
        // The provider spells it "appearences".
        appearances: as_f64(games.and_then(|g| g.get("appearences").or_else(|| g.get("appearances")))),
        minutes: field("games", "minutes"),
        rating: field("games", "rating"),
        shots_total: field("shots", "total"),
        shots_on: field("shots", "on"),
        passes_total: field("passes", "total"),
        passes_accuracy: field("passes", "accuracy"),
        lineups: field("games", "lineups"),
        goals: field("goals", "total"),
    }))
}

/// team id -> rank, flattened across groups.
pub fn parse_standings_json(raw: &str) -> Result<HashMap<u32, u32>> {
    let items = parse_envelope(raw)?;
    let mut out = HashMap::new();
    for item in &items {
        let Some(groups) = item
            .get("league")
            .and_then(|l| l.get("standings"))
            .and_then(|s| s.as_array())
        else {
            continue;
        };
        for group in groups {
            let Some(rows) = group.as_array() else { continue };
            for row in rows {
                let team_id = as_u32(row.get("team").and_then(|t| t.get("id")));
                let rank = as_u32(row.get("rank"));
                if let (Some(team_id), Some(rank)) = (team_id, rank) {
                    out.entry(team_id).or_insert(rank);
                }
            }
        }
    }
    Ok(out)
}

pub fn parse_squad_json(raw: &str) -> Result<Vec<PlayerIdentity>> {
    let items = parse_envelope(raw)?;
    let mut out = Vec::new();
    for item in &items {
        let Some(team_id) = as_u32(item.get("team").and_then(|t| t.get("id"))) else {
            continue;
        };
        let Some(players) = item.get("players").and_then(|p| p.as_array()) else {
            continue;
        };
        for p in players {
            let Some(id) = as_u32(p.get("id")) else { continue };
            out.push(PlayerIdentity {
                id,
                name: as_string(p.get("name")).unwrap_or_default(),
                position: as_string(p.get("position")).unwrap_or_default(),
                team_id,
            });
        }
    }
    Ok(out)
}

// Numbers arrive as JSON numbers, numeric strings ("7.350000", "82%") or null.
fn as_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn as_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn as_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
