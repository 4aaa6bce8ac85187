//! Team season statistics loader. One load record per stat category; a
//! category that fails is recorded and skipped, the rest still land.

use anyhow::Result;
use tracing::{error, info, warn};

use super::{finish_load, LoadCounts, RowError};
use crate::config::Season;
use crate::normalize::{alias_str, normalize_row, team_fields, StatCategory};
use crate::source::{FeedRow, FeedSource, FeedTable};
use crate::store::{LoadTracker, SqlValue, Storage, UpsertReport, UpsertRequest};

const TEAM_STAT_COLUMNS: &[&str] = &[
    "team_id",
    "league_season_id",
    "stat_type",
    "matches_played",
    "wins",
    "draws",
    "losses",
    "goals_for",
    "goals_against",
    "possession_pct",
    "passes_completed",
    "passes_attempted",
    "pass_completion_pct",
    "shots",
    "shots_on_target",
    "shots_on_target_pct",
    "tackles",
    "tackles_won",
    "interceptions",
    "blocks",
    "clearances",
    "yellow_cards",
    "red_cards",
    "fouls_committed",
    "fouls_drawn",
    "additional_stats",
];

const TEAM_STAT_CONFLICT: &[&str] = &["team_id", "league_season_id", "stat_type"];

pub(crate) const TEAM_IDENTITY: &[&str] = &["team", "Team", "Squad"];

/// Canonical stat columns, i.e. everything between the key prefix and the
/// trailing overflow blob.
fn stat_columns() -> &'static [&'static str] {
    &TEAM_STAT_COLUMNS[3..TEAM_STAT_COLUMNS.len() - 1]
}

pub struct TeamStatsLoader<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> {
    store: &'a S,
    source: &'a F,
}

impl<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> TeamStatsLoader<'a, S, F> {
    pub fn new(store: &'a S, source: &'a F) -> Self {
        Self { store, source }
    }

    /// Load team stats for every requested category (default: all).
    pub async fn load(
        &self,
        league_code: &str,
        season: &Season,
        categories: Option<&[StatCategory]>,
        refresh: bool,
    ) -> Result<LoadCounts> {
        let categories = categories.unwrap_or(StatCategory::TEAM);
        info!(league = %league_code, season = %season, "loading team stats");

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
                        "team stat category failed; continuing"
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
        info!(category = %category, "loading team stat category");
        let mut tracker = LoadTracker::new(self.store);
        tracker
            .start(
                self.source.name(),
                &format!("team_stats_{category}"),
                "team_season_stats",
                Some(league_season_id),
            )
            .await?;

        let table = match self
            .source
            .team_season_stats(league_code, season, category, refresh)
            .await
        {
            Ok(table) => table,
            Err(err) => {
                tracker.fail(&err.to_string()).await;
                return Err(err.into());
            }
        };
        if table.is_empty() {
            warn!(category = %category, "no team stats found");
            tracker.complete().await?;
            return Ok(LoadCounts::default());
        }
        info!(count = table.len(), category = %category, "fetched team records");

        let counts = self.process_rows(&table, league_season_id, category).await;
        if let Err(err) = finish_load(&mut tracker, table.len(), &counts).await {
            tracker.fail(&format!("{err:#}")).await;
            return Err(err);
        }
        info!(category = %category, %counts, "team stat processing complete");
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
                    warn!(row = idx, category = %category, error = %err, "skipping team stat row");
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
        let team_name = alias_str(row, TEAM_IDENTITY).ok_or(RowError::MissingTeam)?;
        let team_id = self.store.get_or_create_team(&team_name, None).await?;

        let record = normalize_row(row, &[team_fields(category)], TEAM_IDENTITY);

        let mut values = vec![
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
                table: "team_season_stats",
                columns: TEAM_STAT_COLUMNS,
                rows: vec![values],
                conflict_columns: TEAM_STAT_CONFLICT,
                update_columns: None,
            })
            .await?;
        Ok(report)
    }
}
