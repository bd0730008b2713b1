use serde::Serialize;

use crate::types::{MatchContext, PlayerSeasonStats, StarterStatus, TeamSide};

pub const DEFAULT_STANDING: u32 = 10;

const DEFAULT_POSITION_CODE: f64 = 3.0;
const DEFAULT_MINUTES_PER_MATCH: f64 = 90.0;
const DEFAULT_RATING: f64 = 7.0;
const DEFAULT_PASSES_PER_10: f64 = 250.0;
const DEFAULT_PASS_ACCURACY: f64 = 80.0;
const PROBABLE_STARTER: f64 = 0.8;
const RECENT_GOALS_CAP: f64 = 5.0;
// Rank gap between first and last place in a 20-team league.
const RANK_SPAN: f64 = 19.0;

pub const FEATURE_NAMES: [&str; 20] = [
    "position_encoded",
    "is_starter",
    "is_home",
    "minutes_played",
    "match_rating",
    "shots_total",
    "shots_on",
    "shot_conversion",
    "passes_total",
    "passes_accuracy",
    "team_position",
    "opp_position",
    "goals_last_5",
    "goals_per_match",
    "shots_on_ratio",
    "start_ratio",
    "minutes_share",
    "rank_advantage",
    "form_trend",
    "attack_threat",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureSchema {
    /// The first twelve features, in order.
    #[serde(rename = "v12")]
    V12,
    #[serde(rename = "v20")]
    V20,
}

impl FeatureSchema {
    pub fn len(self) -> usize {
        match self {
            FeatureSchema::V12 => 12,
            FeatureSchema::V20 => FEATURE_COUNT,
        }
    }

    pub fn names(self) -> &'static [&'static str] {
        &FEATURE_NAMES[..self.len()]
    }

    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            12 => Some(FeatureSchema::V12),
            FEATURE_COUNT => Some(FeatureSchema::V20),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeatureSchema::V12 => "v12",
            FeatureSchema::V20 => "v20",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self, schema: FeatureSchema) -> &[f64] {
        &self.values[..schema.len()]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }

    pub fn is_starter(&self) -> f64 {
        self.values[1]
    }
    pub fn is_home(&self) -> bool {
        self.values[2] >= 0.5
    }
    pub fn match_rating(&self) -> f64 {
        self.values[4]
    }
    pub fn shots_total(&self) -> f64 {
        self.values[5]
    }
    pub fn shot_conversion(&self) -> f64 {
        self.values[7]
    }
    pub fn goals_last_5(&self) -> f64 {
        self.values[12]
    }

    pub fn iter_named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

/// Map season aggregates plus match context into the v20 feature vector.
pub fn build(
    stats: &PlayerSeasonStats,
    side: TeamSide,
    starter: StarterStatus,
    context: MatchContext,
) -> FeatureVector {
    let appearances = clean(stats.appearances);
    let games_per_10 = appearances.map(|a| a / 10.0).unwrap_or(0.0).max(1.0);
    let matches = appearances.unwrap_or(0.0).max(1.0);

    let position_encoded = stats
        .position
        .map(|p| p.code())
        .unwrap_or(DEFAULT_POSITION_CODE);
    let is_starter = match starter {
        StarterStatus::Confirmed => 1.0,
        StarterStatus::Probable => PROBABLE_STARTER,
        StarterStatus::Benched => 0.0,
    };
    let is_home = if side.is_home() { 1.0 } else { 0.0 };

    let minutes_played = match (clean(stats.minutes), appearances) {
        (Some(minutes), Some(apps)) if apps > 0.0 => minutes / apps.max(1.0),
        _ => DEFAULT_MINUTES_PER_MATCH,
    };
    let match_rating = clean(stats.rating)
        .map(|r| r.clamp(0.0, 10.0))
        .unwrap_or(DEFAULT_RATING);

    let shots_raw = clean(stats.shots_total).unwrap_or(0.0);
    let shots_on_raw = clean(stats.shots_on).unwrap_or(0.0);
    let goals_raw = clean(stats.goals).unwrap_or(0.0);

    let shots_total = shots_raw / games_per_10;
    let shots_on = shots_on_raw / games_per_10;
    let shot_conversion = if shots_raw > 0.0 {
        (goals_raw / shots_raw.max(1.0)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let passes_total = clean(stats.passes_total)
        .map(|p| p / games_per_10)
        .unwrap_or(DEFAULT_PASSES_PER_10);
    let passes_accuracy = clean(stats.passes_accuracy)
        .map(|p| p.clamp(0.0, 100.0))
        .unwrap_or(DEFAULT_PASS_ACCURACY);

    let team_position = context.team_position as f64;
    let opp_position = context.opp_position as f64;

    let goals_last_5 = goals_raw.min(RECENT_GOALS_CAP);
    let goals_per_match = goals_raw / matches;
    let shots_on_ratio = (shots_on_raw / shots_raw.max(1.0)).clamp(0.0, 1.0);
    let start_ratio = (clean(stats.lineups).unwrap_or(0.0) / matches).clamp(0.0, 1.0);
    let minutes_share = (minutes_played / DEFAULT_MINUTES_PER_MATCH).clamp(0.0, 1.0);
    let rank_advantage = ((opp_position - team_position) / RANK_SPAN).clamp(-1.0, 1.0);
    let form_trend =
        (goals_last_5 / RECENT_GOALS_CAP - goals_per_match.min(1.0)).clamp(-1.0, 1.0);
    let attack_threat = (shots_on_raw / matches) * shot_conversion;

    FeatureVector::from_values([
        position_encoded,
        is_starter,
        is_home,
        minutes_played,
        match_rating,
        shots_total,
        shots_on,
        shot_conversion,
        passes_total,
        passes_accuracy,
        team_position,
        opp_position,
        goals_last_5,
        goals_per_match,
        shots_on_ratio,
        start_ratio,
        minutes_share,
        rank_advantage,
        form_trend,
        attack_threat,
    ])
}

// Negative or non-finite upstream numbers are as good as missing.
fn clean(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}
