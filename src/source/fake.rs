//! Scripted feed for tests: preloaded tables per (league, season[,
//! category]) and switchable endpoint failures. Unknown requests yield an
//! empty table, the same as a source with nothing to report.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{FeedSource, FeedTable, SourceError};
use crate::config::Season;
use crate::normalize::StatCategory;

#[derive(Default)]
pub struct ScriptedFeed {
    name: String,
    schedule: HashMap<(String, String), FeedTable>,
    team_stats: HashMap<(String, String, StatCategory), FeedTable>,
    player_stats: HashMap<(String, String, StatCategory), FeedTable>,
    league_table: HashMap<(String, String), FeedTable>,
    fail_schedule: bool,
    fail_team_stats: bool,
    fail_player_stats: bool,
    fail_league_table: bool,
}

impl ScriptedFeed {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_schedule(mut self, league: &str, season: &str, table: FeedTable) -> Self {
        self.schedule
            .insert((league.to_string(), season.to_string()), table);
        self
    }

    pub fn with_team_stats(
        mut self,
        league: &str,
        season: &str,
        category: StatCategory,
        table: FeedTable,
    ) -> Self {
        self.team_stats
            .insert((league.to_string(), season.to_string(), category), table);
        self
    }

    pub fn with_player_stats(
        mut self,
        league: &str,
        season: &str,
        category: StatCategory,
        table: FeedTable,
    ) -> Self {
        self.player_stats
            .insert((league.to_string(), season.to_string(), category), table);
        self
    }

    pub fn with_league_table(mut self, league: &str, season: &str, table: FeedTable) -> Self {
        self.league_table
            .insert((league.to_string(), season.to_string()), table);
        self
    }

    pub fn failing_schedule(mut self) -> Self {
        self.fail_schedule = true;
        self
    }

    pub fn failing_team_stats(mut self) -> Self {
        self.fail_team_stats = true;
        self
    }

    pub fn failing_player_stats(mut self) -> Self {
        self.fail_player_stats = true;
        self
    }

    pub fn failing_league_table(mut self) -> Self {
        self.fail_league_table = true;
        self
    }
}

fn injected() -> SourceError {
    SourceError::Decode("injected failure".into())
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn schedule(
        &self,
        league_code: &str,
        season: &Season,
        _refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        if self.fail_schedule {
            return Err(injected());
        }
        Ok(self
            .schedule
            .get(&(league_code.to_string(), season.label()))
            .cloned()
            .unwrap_or_default())
    }

    async fn team_season_stats(
        &self,
        league_code: &str,
        season: &Season,
        category: StatCategory,
        _refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        if self.fail_team_stats {
            return Err(injected());
        }
        Ok(self
            .team_stats
            .get(&(league_code.to_string(), season.label(), category))
            .cloned()
            .unwrap_or_default())
    }

    async fn player_season_stats(
        &self,
        league_code: &str,
        season: &Season,
        category: StatCategory,
        _refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        if self.fail_player_stats {
            return Err(injected());
        }
        Ok(self
            .player_stats
            .get(&(league_code.to_string(), season.label(), category))
            .cloned()
            .unwrap_or_default())
    }

    async fn league_table(
        &self,
        league_code: &str,
        season: &Season,
        _refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        if self.fail_league_table {
            return Err(injected());
        }
        Ok(self
            .league_table
            .get(&(league_code.to_string(), season.label()))
            .cloned()
            .unwrap_or_default())
    }
}
