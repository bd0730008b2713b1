use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceLevel;
use crate::ensemble::PredictorMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u32,
    // Raw provider timestamp; may be malformed, see `kickoff_utc`.
    pub kickoff: String,
    pub league_id: u32,
    pub season: u16,
    pub home_team_id: u32,
    pub home_team: String,
    pub away_team_id: u32,
    pub away_team: String,
    #[serde(default)]
    pub status: String,
}

impl Fixture {
    pub fn kickoff_utc(&self) -> Option<DateTime<Utc>> {
        parse_kickoff(&self.kickoff)
    }

    pub fn label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    pub fn team_for(&self, side: TeamSide) -> (u32, &str) {
        match side {
            TeamSide::Home => (self.home_team_id, &self.home_team),
            TeamSide::Away => (self.away_team_id, &self.away_team),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status.trim().to_ascii_uppercase().as_str(),
            "FT" | "AET" | "PEN" | "CANC" | "PST" | "ABD" | "AWD" | "WO"
        )
    }
}

/// Lenient kickoff parsing: RFC 3339 first, then the naive `YYYY-MM-DD HH:MM`
/// shapes some feeds emit (interpreted as UTC).
pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    let cleaned = trimmed.trim_end_matches('Z').replace(' ', "T");
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn is_home(self) -> bool {
        matches!(self, TeamSide::Home)
    }

    pub fn opposite(self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(alias = "G")]
    Goalkeeper,
    #[serde(alias = "D")]
    Defender,
    #[serde(alias = "M")]
    Midfielder,
    #[serde(alias = "F")]
    Attacker,
}

impl Position {
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        if s.is_empty() {
            return None;
        }
        match s.as_str() {
            "g" | "gk" => return Some(Position::Goalkeeper),
            "d" | "df" => return Some(Position::Defender),
            "m" | "mf" => return Some(Position::Midfielder),
            "f" | "fw" | "a" => return Some(Position::Attacker),
            _ => {}
        }
        if s.contains("keeper") {
            return Some(Position::Goalkeeper);
        }
        if s.contains("defen") || s.contains("back") {
            return Some(Position::Defender);
        }
        if s.contains("midfield") {
            return Some(Position::Midfielder);
        }
        if s.contains("attack") || s.contains("forward") || s.contains("striker") || s.contains("wing") {
            return Some(Position::Attacker);
        }
        None
    }

    pub fn code(self) -> f64 {
        match self {
            Position::Goalkeeper => 0.0,
            Position::Defender => 1.0,
            Position::Midfielder => 2.0,
            Position::Attacker => 3.0,
        }
    }
}

/// Season-to-date aggregates for one player in one league. Any field may be
/// missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSeasonStats {
    pub player_id: u32,
    pub name: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub appearances: Option<f64>,
    #[serde(default)]
    pub minutes: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub shots_total: Option<f64>,
    #[serde(default)]
    pub shots_on: Option<f64>,
    #[serde(default)]
    pub passes_total: Option<f64>,
    #[serde(default)]
    pub passes_accuracy: Option<f64>,
    #[serde(default)]
    pub lineups: Option<f64>,
    #[serde(default)]
    pub goals: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub position: String,
    pub team_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamLineup {
    pub team_id: u32,
    pub starters: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupAnnouncement {
    pub fixture_id: u32,
    pub home: TeamLineup,
    pub away: TeamLineup,
}

impl LineupAnnouncement {
    pub fn team(&self, team_id: u32) -> Option<&TeamLineup> {
        if self.home.team_id == team_id {
            Some(&self.home)
        } else if self.away.team_id == team_id {
            Some(&self.away)
        } else {
            None
        }
    }

    pub fn is_starter(&self, team_id: u32, player_id: u32) -> bool {
        self.team(team_id)
            .is_some_and(|t| t.starters.contains(&player_id))
    }

    pub fn is_empty(&self) -> bool {
        self.home.starters.is_empty() && self.away.starters.is_empty()
    }
}

/// Whether a player is expected to start. `Probable` is used whenever no
/// authoritative lineup is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarterStatus {
    Confirmed,
    Probable,
    Benched,
}

impl StarterStatus {
    pub fn is_confirmed(self) -> bool {
        matches!(self, StarterStatus::Confirmed)
    }
}

/// League-table context shared by every player of one side in a fixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchContext {
    pub team_position: u32,
    pub opp_position: u32,
}

impl Default for MatchContext {
    fn default() -> Self {
        Self {
            team_position: crate::features::DEFAULT_STANDING,
            opp_position: crate::features::DEFAULT_STANDING,
        }
    }
}

/// One player described by the caller rather than fetched. Omitted stats
/// take the feature defaults; omitted context means a confirmed starter at
/// home against a mid-table side.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerQuery {
    #[serde(flatten)]
    pub stats: PlayerSeasonStats,
    pub side: Option<TeamSide>,
    pub starter: Option<StarterStatus>,
    pub team_position: Option<u32>,
    pub opp_position: Option<u32>,
}

impl PlayerQuery {
    pub fn side(&self) -> TeamSide {
        self.side.unwrap_or(TeamSide::Home)
    }

    pub fn starter(&self) -> StarterStatus {
        self.starter.unwrap_or(StarterStatus::Confirmed)
    }

    pub fn context(&self) -> MatchContext {
        let defaults = MatchContext::default();
        MatchContext {
            team_position: self.team_position.unwrap_or(defaults.team_position),
            opp_position: self.opp_position.unwrap_or(defaults.opp_position),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub player_id: u32,
    pub player_name: String,
    pub team: String,
    pub opponent: String,
    pub fixture_id: u32,
    pub match_label: String,
    pub kickoff: String,
    pub side: TeamSide,
    pub probability: f64,
    pub confidence: ConfidenceLevel,
    pub sub_scores: BTreeMap<String, f64>,
    pub is_starter_confirmed: bool,
    pub mode: PredictorMode,
}

impl PredictionResult {
    /// Probability on the 0-100 scale, one decimal.
    pub fn probability_pct(&self) -> f64 {
        (self.probability * 1000.0).round() / 10.0
    }

    pub fn to_public(&self) -> PublicPrediction {
        PublicPrediction {
            player_id: self.player_id,
            player: self.player_name.clone(),
            team: self.team.clone(),
            opponent: self.opponent.clone(),
            fixture_id: self.fixture_id,
            r#match: self.match_label.clone(),
            kickoff: self.kickoff.clone(),
            is_home: self.side.is_home(),
            probability: self.probability_pct(),
            confidence_level: self.confidence,
            is_starter_confirmed: self.is_starter_confirmed,
            predictor: self.mode,
            sub_scores: self.sub_scores.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicPrediction {
    pub player_id: u32,
    pub player: String,
    pub team: String,
    pub opponent: String,
    pub fixture_id: u32,
    pub r#match: String,
    pub kickoff: String,
    pub is_home: bool,
    pub probability: f64,
    pub confidence_level: ConfidenceLevel,
    pub is_starter_confirmed: bool,
    pub predictor: PredictorMode,
    pub sub_scores: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kickoff_parses_offset_and_naive_forms() {
        let a = parse_kickoff("2026-10-18T15:00:00+02:00").unwrap();
        assert_eq!(a.to_rfc3339(), "2026-10-18T13:00:00+00:00");
        let b = parse_kickoff("2026-10-18 13:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_kickoff("tomorrow-ish").is_none());
        assert!(parse_kickoff("").is_none());
    }

    #[test]
    fn position_parse_handles_codes_and_words() {
        assert_eq!(Position::parse("F"), Some(Position::Attacker));
        assert_eq!(Position::parse("Goalkeeper"), Some(Position::Goalkeeper));
        assert_eq!(Position::parse("Centre-Back"), Some(Position::Defender));
        assert_eq!(Position::parse("Midfielder"), Some(Position::Midfielder));
        assert_eq!(Position::parse("??"), None);
    }

    #[test]
    fn player_query_fills_gaps_with_defaults() {
        let q: PlayerQuery = serde_json::from_str(r#"{"position":"F","shots_total":3}"#).unwrap();
        assert_eq!(q.stats.position, Some(Position::Attacker));
        assert_eq!(q.stats.shots_total, Some(3.0));
        assert_eq!(q.stats.player_id, 0);
        assert_eq!(q.side(), TeamSide::Home);
        assert_eq!(q.starter(), StarterStatus::Confirmed);
        assert_eq!(q.context(), MatchContext::default());

        let q: PlayerQuery =
            serde_json::from_str(r#"{"side":"away","starter":"probable","opp_position":2}"#).unwrap();
        assert_eq!(q.side(), TeamSide::Away);
        assert_eq!(q.starter(), StarterStatus::Probable);
        assert_eq!(q.context().opp_position, 2);
        assert_eq!(q.context().team_position, 10);
    }

    #[test]
    fn lineup_membership_is_per_team() {
        let lineup = LineupAnnouncement {
            fixture_id: 1,
            home: TeamLineup {
                team_id: 10,
                starters: vec![1, 2],
            },
            away: TeamLineup {
                team_id: 20,
                starters: vec![3],
            },
        };
        assert!(lineup.is_starter(10, 1));
        assert!(!lineup.is_starter(20, 1));
        assert!(!lineup.is_starter(99, 3));
    }

    #[test]
    fn probability_pct_rounds_to_one_decimal() {
        let p = PredictionResult {
            player_id: 1,
            player_name: "P".into(),
            team: "H".into(),
            opponent: "A".into(),
            fixture_id: 1,
            match_label: "H vs A".into(),
            kickoff: String::new(),
            side: TeamSide::Home,
            probability: 0.87249,
            confidence: ConfidenceLevel::TresEleve,
            sub_scores: BTreeMap::new(),
            is_starter_confirmed: false,
            mode: PredictorMode::Heuristic,
        };
        assert!((p.probability_pct() - 87.2).abs() < 1e-9);
    }
}
