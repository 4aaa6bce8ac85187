//! League table loader: dated snapshots keyed by (league season, team,
//! date). Position falls back to row order when the feed omits a rank
//! column; goal difference falls back to GF − GA.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use super::team_stats::TEAM_IDENTITY;
use super::{finish_load, LoadCounts, RowError};
use crate::config::Season;
use crate::normalize::{alias_str, coerce_int, first_alias};
use crate::source::{FeedRow, FeedSource, FeedTable};
use crate::store::{LoadTracker, SqlValue, Storage, UpsertReport, UpsertRequest};

const STANDING_COLUMNS: &[&str] = &[
    "league_season_id",
    "team_id",
    "position",
    "matches_played",
    "wins",
    "draws",
    "losses",
    "goals_for",
    "goals_against",
    "goal_difference",
    "points",
    "home_wins",
    "home_draws",
    "home_losses",
    "away_wins",
    "away_draws",
    "away_losses",
    "standing_date",
];

const STANDING_CONFLICT: &[&str] = &["league_season_id", "team_id", "standing_date"];

pub struct StandingsLoader<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> {
    store: &'a S,
    source: &'a F,
}

impl<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> StandingsLoader<'a, S, F> {
    pub fn new(store: &'a S, source: &'a F) -> Self {
        Self { store, source }
    }

    /// Load the league table as a snapshot dated `standing_date`
    /// (default: today).
    pub async fn load(
        &self,
        league_code: &str,
        season: &Season,
        standing_date: Option<NaiveDate>,
        refresh: bool,
    ) -> Result<LoadCounts> {
        let standing_date = standing_date.unwrap_or_else(|| Utc::now().date_naive());
        info!(league = %league_code, season = %season, date = %standing_date, "loading standings");

        let Some(league_season_id) = self
            .store
            .league_season_id(league_code, &season.label())
            .await?
        else {
            error!(league = %league_code, season = %season, "league season not found");
            return Ok(LoadCounts::default());
        };

        let mut tracker = LoadTracker::new(self.store);
        tracker
            .start(
                self.source.name(),
                "standings_load",
                "league_standings",
                Some(league_season_id),
            )
            .await?;

        let table = match self.source.league_table(league_code, season, refresh).await {
            Ok(table) => table,
            Err(err) => {
                tracker.fail(&err.to_string()).await;
                return Err(err.into());
            }
        };
        if table.is_empty() {
            warn!(league = %league_code, season = %season, "no standings found");
            tracker.complete().await?;
            return Ok(LoadCounts::default());
        }
        info!(count = table.len(), "fetched league table");

        let counts = self
            .process_rows(&table, league_season_id, standing_date)
            .await;
        if let Err(err) = finish_load(&mut tracker, table.len(), &counts).await {
            tracker.fail(&format!("{err:#}")).await;
            return Err(err);
        }
        info!(league = %league_code, season = %season, %counts, "standings processing complete");
        Ok(counts)
    }

    async fn process_rows(
        &self,
        table: &FeedTable,
        league_season_id: i64,
        standing_date: NaiveDate,
    ) -> LoadCounts {
        let mut counts = LoadCounts::default();
        for (idx, row) in table.iter().enumerate() {
            match self
                .process_row(row, idx, league_season_id, standing_date)
                .await
            {
                Ok(report) => counts.absorb(&report),
                Err(err) => {
                    warn!(row = idx, error = %err, "skipping standings row");
                    counts.failed += 1;
                }
            }
        }
        counts
    }

    async fn process_row(
        &self,
        row: &FeedRow,
        idx: usize,
        league_season_id: i64,
        standing_date: NaiveDate,
    ) -> Result<UpsertReport, RowError> {
        let team_name = alias_str(row, TEAM_IDENTITY).ok_or(RowError::MissingTeam)?;
        let team_id = self.store.get_or_create_team(&team_name, None).await?;

        let get = |aliases: &[&str]| first_alias(row, aliases).and_then(coerce_int);

        // Row order is the position of record unless the table ranks itself.
        let position = get(&["Rk"]).unwrap_or(idx as i64 + 1);
        let matches_played = get(&["MP", "Matches", "Pld"]).unwrap_or(0);
        let wins = get(&["W", "Wins"]).unwrap_or(0);
        let draws = get(&["D", "Draws"]).unwrap_or(0);
        let losses = get(&["L", "Losses"]).unwrap_or(0);
        let goals_for = get(&["GF", "Goals For", "F"]).unwrap_or(0);
        let goals_against = get(&["GA", "Goals Against", "A"]).unwrap_or(0);
        let goal_difference =
            get(&["GD", "Goal Difference"]).unwrap_or(goals_for - goals_against);
        let points = get(&["Pts", "Points"]).unwrap_or(0);

        let values = vec![
            SqlValue::BigInt(league_season_id),
            SqlValue::BigInt(team_id),
            SqlValue::BigInt(position),
            SqlValue::BigInt(matches_played),
            SqlValue::BigInt(wins),
            SqlValue::BigInt(draws),
            SqlValue::BigInt(losses),
            SqlValue::BigInt(goals_for),
            SqlValue::BigInt(goals_against),
            SqlValue::BigInt(goal_difference),
            SqlValue::BigInt(points),
            SqlValue::opt_int(get(&["Home W"])),
            SqlValue::opt_int(get(&["Home D"])),
            SqlValue::opt_int(get(&["Home L"])),
            SqlValue::opt_int(get(&["Away W"])),
            SqlValue::opt_int(get(&["Away D"])),
            SqlValue::opt_int(get(&["Away L"])),
            SqlValue::Date(standing_date),
        ];

        let report = self
            .store
            .upsert(UpsertRequest {
                table: "league_standings",
                columns: STANDING_COLUMNS,
                rows: vec![values],
                conflict_columns: STANDING_CONFLICT,
                update_columns: None,
            })
            .await?;
        Ok(report)
    }
}
