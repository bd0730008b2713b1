use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{LineupAnnouncement, StarterStatus, parse_kickoff};

pub const LINEUP_WINDOW_OPEN_MIN: f64 = 40.0;
pub const LINEUP_WINDOW_CLOSE_MIN: f64 = 20.0;
/// A captured lineup is dropped this long after kickoff.
pub const LINEUP_RETENTION_MIN: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineupPhase {
    /// Only season-average "probable starter" status is usable.
    PreLineup,
    /// Official lineups are authoritative and must be consulted.
    LineupWindow,
    /// Lineups captured during the window stay valid; no fresh fetch.
    PostWindow,
}

impl LineupPhase {
    pub fn wants_fresh_lineup(self) -> bool {
        matches!(self, LineupPhase::LineupWindow)
    }
}

/// Phase for a raw provider kickoff string. Unparsable input degrades to
/// `PreLineup`.
pub fn phase(kickoff: &str, now: DateTime<Utc>) -> LineupPhase {
    phase_at(parse_kickoff(kickoff), now)
}

pub fn phase_at(kickoff: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LineupPhase {
    let Some(kickoff) = kickoff else {
        return LineupPhase::PreLineup;
    };
    let minutes = minutes_to_kickoff(kickoff, now);
    if minutes > LINEUP_WINDOW_OPEN_MIN {
        LineupPhase::PreLineup
    } else if minutes >= LINEUP_WINDOW_CLOSE_MIN {
        LineupPhase::LineupWindow
    } else {
        LineupPhase::PostWindow
    }
}

pub fn minutes_to_kickoff(kickoff: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (kickoff - now).num_milliseconds() as f64 / 60_000.0
}

pub fn lineup_expired(kickoff: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    minutes_to_kickoff(kickoff, now) < -LINEUP_RETENTION_MIN
}

/// Starter status for one player. `lineup` is whatever the caller holds for
/// the fixture: a fresh in-window fetch, or one captured earlier in the
/// window when `phase` is `PostWindow`.
pub fn resolve_starter(
    phase: LineupPhase,
    lineup: Option<&LineupAnnouncement>,
    team_id: u32,
    player_id: u32,
) -> StarterStatus {
    if phase == LineupPhase::PreLineup {
        return StarterStatus::Probable;
    }
    let Some(lineup) = lineup.filter(|l| l.team(team_id).is_some_and(|t| !t.starters.is_empty()))
    else {
        return StarterStatus::Probable;
    };
    if lineup.is_starter(team_id, player_id) {
        StarterStatus::Confirmed
    } else {
        StarterStatus::Benched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TeamLineup;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 14, 0, 0).unwrap()
    }

    fn at(minutes: i64) -> Option<DateTime<Utc>> {
        Some(now() + Duration::minutes(minutes))
    }

    #[test]
    fn window_bounds_are_inclusive() {
        assert_eq!(phase_at(at(41), now()), LineupPhase::PreLineup);
        assert_eq!(phase_at(at(40), now()), LineupPhase::LineupWindow);
        assert_eq!(phase_at(at(30), now()), LineupPhase::LineupWindow);
        assert_eq!(phase_at(at(20), now()), LineupPhase::LineupWindow);
        assert_eq!(phase_at(at(19), now()), LineupPhase::PostWindow);
        assert_eq!(phase_at(at(-45), now()), LineupPhase::PostWindow);
    }

    #[test]
    fn just_outside_the_window_by_seconds() {
        let k = now() + Duration::minutes(40) + Duration::seconds(1);
        assert_eq!(phase_at(Some(k), now()), LineupPhase::PreLineup);
        let k = now() + Duration::minutes(20) - Duration::seconds(1);
        assert_eq!(phase_at(Some(k), now()), LineupPhase::PostWindow);
    }

    #[test]
    fn lineups_expire_three_hours_after_kickoff() {
        let kickoff = now();
        assert!(!lineup_expired(kickoff, now() - Duration::minutes(30)));
        assert!(!lineup_expired(kickoff, now() + Duration::minutes(180)));
        assert!(lineup_expired(kickoff, now() + Duration::minutes(181)));
        assert!(LineupPhase::LineupWindow.wants_fresh_lineup());
        assert!(!LineupPhase::PostWindow.wants_fresh_lineup());
    }

    #[test]
    fn malformed_kickoff_degrades_to_pre_lineup() {
        assert_eq!(phase("not a date", now()), LineupPhase::PreLineup);
        assert_eq!(phase("", now()), LineupPhase::PreLineup);
        assert_eq!(phase("2026-10-18T14:30:00+00:00", now()), LineupPhase::LineupWindow);
    }

    #[test]
    fn starter_resolution_follows_phase() {
        let lineup = LineupAnnouncement {
            fixture_id: 7,
            home: TeamLineup {
                team_id: 1,
                starters: vec![11, 12],
            },
            away: TeamLineup {
                team_id: 2,
                starters: Vec::new(),
            },
        };
        let w = LineupPhase::LineupWindow;
        assert_eq!(resolve_starter(w, Some(&lineup), 1, 11), StarterStatus::Confirmed);
        assert_eq!(resolve_starter(w, Some(&lineup), 1, 99), StarterStatus::Benched);
        // Away roster not published yet.
        assert_eq!(resolve_starter(w, Some(&lineup), 2, 21), StarterStatus::Probable);
        assert_eq!(resolve_starter(w, None, 1, 11), StarterStatus::Probable);
        assert_eq!(
            resolve_starter(LineupPhase::PreLineup, Some(&lineup), 1, 11),
            StarterStatus::Probable
        );
        assert_eq!(
            resolve_starter(LineupPhase::PostWindow, Some(&lineup), 1, 11),
            StarterStatus::Confirmed
        );
    }
}
