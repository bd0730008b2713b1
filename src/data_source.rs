//! Data-access seam between the pipeline and a sports-data provider.
//!
//! Every call is blocking and may fail independently; the pipeline treats a
//! failed call like missing data for the affected fixture or player.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;

use crate::types::{Fixture, LineupAnnouncement, PlayerIdentity, PlayerSeasonStats};

pub trait FootballData: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// False when the provider lacks its credential. Callers return empty
    /// results instead of hitting the network.
    fn is_configured(&self) -> bool;

    fn get_fixtures(&self, league_ids: &[u32], date: NaiveDate) -> Result<Vec<Fixture>>;

    fn get_fixture(&self, fixture_id: u32) -> Result<Option<Fixture>>;

    /// `None` until the provider publishes the lineups.
    fn get_lineups(&self, fixture_id: u32) -> Result<Option<LineupAnnouncement>>;

    fn get_player_season_stats(
        &self,
        player_id: u32,
        league_id: u32,
        season: u16,
    ) -> Result<Option<PlayerSeasonStats>>;

    /// Whole league table as team id -> rank (1 = top).
    fn get_standings(&self, league_id: u32, season: u16) -> Result<HashMap<u32, u32>>;

    /// Single-team lookup; `None` when the team is not in the table.
    fn get_team_standing(&self, league_id: u32, season: u16, team_id: u32) -> Result<Option<u32>> {
        Ok(self.get_standings(league_id, season)?.get(&team_id).copied())
    }

    fn get_squad(&self, team_id: u32) -> Result<Vec<PlayerIdentity>>;
}
