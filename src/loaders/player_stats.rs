//! Player season statistics loader. Resolves both the player and the team
//! the row attributes them to; new players capture nationality/position at
//! first sighting only.

use anyhow::Result;
use tracing::{error, info, warn};

use super::{finish_load, LoadCounts, RowError};
use crate::config::Season;
use crate::normalize::{
    alias_str, normalize_row, player_fields, truncate_chars, StatCategory, PLAYER_COMMON,
};
use crate::source::{FeedRow, FeedSource, FeedTable};
use crate::store::{LoadTracker, PlayerAttrs, SqlValue, Storage, UpsertReport, UpsertRequest};

const PLAYER_STAT_COLUMNS: &[&str] = &[
    "player_id",
    "team_id",
    "league_season_id",
    "stat_type",
    "matches_played",
    "starts",
    "minutes_played",
    "goals",
    "assists",
    "penalty_goals",
    "penalty_attempts",
    "shots",
    "shots_on_target",
    "shots_on_target_pct",
    "goals_per_shot",
    "passes_completed",
    "passes_attempted",
    "pass_completion_pct",
    "key_passes",
    "tackles",
    "tackles_won",
    "interceptions",
    "blocks",
    "clearances",
    "yellow_cards",
    "red_cards",
    "fouls_committed",
    "fouls_drawn",
    "saves",
    "saves_pct",
    "clean_sheets",
    "goals_against",
    "additional_stats",
];

const PLAYER_STAT_CONFLICT: &[&str] =
    &["player_id", "team_id", "league_season_id", "stat_type"];

const PLAYER_ALIASES: &[&str] = &["player", "Player"];
const TEAM_ALIASES: &[&str] = &["team", "Squad"];
const NATIONALITY_ALIASES: &[&str] = &["nationality", "Nation"];
const POSITION_ALIASES: &[&str] = &["position", "Pos"];

/// Identity columns kept out of the overflow map.
const PLAYER_IDENTITY: &[&str] = &[
    "player",
    "Player",
    "team",
    "Squad",
    "nationality",
    "Nation",
    "position",
    "Pos",
];

fn stat_columns() -> &'static [&'static str] {
    &PLAYER_STAT_COLUMNS[4..PLAYER_STAT_COLUMNS.len() - 1]
}

pub struct PlayerStatsLoader<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> {
    store: &'a S,
    source: &'a F,
}

impl<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> PlayerStatsLoader<'a, S, F> {
    pub fn new(store: &'a S, source: &'a F) -> Self {
        Self { store, source }
    }

    /// Load player stats for the requested categories (default: all except
    /// goalkeeping).
    pub async fn load(
        &self,
        league_code: &str,
        season: &Season,
        categories: Option<&[StatCategory]>,
        refresh: bool,
    ) -> Result<LoadCounts> {
        let defaults = StatCategory::player_defaults();
        let categories = categories.unwrap_or(defaults.as_slice());
        info!(league = %league_code, season = %season, "loading player stats");

        let Some(league_season_id) = self
            .store
            .league_season_id(league_code, &season.label())
            .await?
        else {
            error!(league = %league_code, season = %season, "league season not found");
            return Ok(LoadCounts::default());
        };

        let mut totals = LoadCounts::default();
        for category in categories {
            match self
                .load_category(league_code, season, league_season_id, *category, refresh)
                .await
            {
                Ok(counts) => totals += counts,
                Err(err) => {
                    error!(
                        category = %category,
                        error = %format!("{err:#}"),
                        "player stat category failed; continuing"
                    );
                }
            }
        }
        Ok(totals)
    }

    async fn load_category(
        &self,
        league_code: &str,
        season: &Season,
        league_season_id: i64,
        category: StatCategory,
        refresh: bool,
    ) -> Result<LoadCounts> {
        info!(category = %category, "loading player stat category");
        let mut tracker = LoadTracker::new(self.store);
        tracker
            .start(
                self.source.name(),
                &format!("player_stats_{category}"),
                "player_season_stats",
                Some(league_season_id),
            )
            .await?;

        let table = match self
            .source
            .player_season_stats(league_code, season, category, refresh)
            .await
        {
            Ok(table) => table,
            Err(err) => {
                tracker.fail(&err.to_string()).await;
                return Err(err.into());
            }
        };
        if table.is_empty() {
            warn!(category = %category, "no player stats found");
            tracker.complete().await?;
            return Ok(LoadCounts::default());
        }
        info!(count = table.len(), category = %category, "fetched player records");

        let counts = self.process_rows(&table, league_season_id, category).await;
        if let Err(err) = finish_load(&mut tracker, table.len(), &counts).await {
            tracker.fail(&format!("{err:#}")).await;
            return Err(err);
        }
        info!(category = %category, %counts, "player stat processing complete");
        Ok(counts)
    }

    async fn process_rows(
        &self,
        table: &FeedTable,
        league_season_id: i64,
        category: StatCategory,
    ) -> LoadCounts {
        let mut counts = LoadCounts::default();
        for (idx, row) in table.iter().enumerate() {
            match self.process_row(row, league_season_id, category).await {
                Ok(report) => counts.absorb(&report),
                Err(err) => {
                    warn!(row = idx, category = %category, error = %err, "skipping player stat row");
                    counts.failed += 1;
                }
            }
        }
        counts
    }

    async fn process_row(
        &self,
        row: &FeedRow,
        league_season_id: i64,
        category: StatCategory,
    ) -> Result<UpsertReport, RowError> {
        let player_name = alias_str(row, PLAYER_ALIASES).ok_or(RowError::MissingPlayer)?;
        let team_name = alias_str(row, TEAM_ALIASES).ok_or(RowError::MissingTeam)?;

        let attrs = player_attrs(row);
        let player_id = self.store.get_or_create_player(&player_name, &attrs).await?;
        let team_id = self.store.get_or_create_team(&team_name, None).await?;

        let record = normalize_row(
            row,
            &[PLAYER_COMMON, player_fields(category)],
            PLAYER_IDENTITY,
        );

        let mut values = vec![
            SqlValue::BigInt(player_id),
            SqlValue::BigInt(team_id),
            SqlValue::BigInt(league_season_id),
            SqlValue::Text(category.as_str().to_string()),
        ];
        for column in stat_columns() {
            values.push(SqlValue::from_attr(record.column(column)));
        }
        values.push(SqlValue::Json(record.extra_json()));

        let report = self
            .store
            .upsert(UpsertRequest {
                table: "player_season_stats",
                columns: PLAYER_STAT_COLUMNS,
                rows: vec![values],
                conflict_columns: PLAYER_STAT_CONFLICT,
                update_columns: None,
            })
            .await?;
        Ok(report)
    }
}

/// Attributes captured when a player is first created. Positions arrive as
/// composites ("FW,MF"); only the primary one is kept.
fn player_attrs(row: &FeedRow) -> PlayerAttrs {
    let nationality = alias_str(row, NATIONALITY_ALIASES).map(|s| truncate_chars(&s, 50));
    let position = alias_str(row, POSITION_ALIASES).map(|s| {
        let primary = s.split(',').next().unwrap_or("").trim();
        truncate_chars(primary, 20)
    });
    PlayerAttrs {
        nationality,
        position,
        birth_date: None,
    }
}
