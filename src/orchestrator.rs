//! Top-level run driver: iterates (league × season) units through the four
//! category loaders in fixed order. A unit that blows up is logged and
//! skipped; the batch always finishes.

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::time::sleep;
use tracing::{error, info};

use crate::config::Season;
use crate::loaders::matches::MatchLoader;
use crate::loaders::player_stats::PlayerStatsLoader;
use crate::loaders::standings::StandingsLoader;
use crate::loaders::team_stats::TeamStatsLoader;
use crate::loaders::LoadCounts;
use crate::source::FeedSource;
use crate::store::Storage;

/// Which categories a run touches. Defaults to everything.
#[derive(Debug, Clone, Copy)]
pub struct CategoryToggles {
    pub matches: bool,
    pub team_stats: bool,
    pub player_stats: bool,
    pub standings: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            matches: true,
            team_stats: true,
            player_stats: true,
            standings: true,
        }
    }
}

/// Run-wide totals, one bucket per category.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RunTotals {
    pub matches: LoadCounts,
    pub team_stats: LoadCounts,
    pub player_stats: LoadCounts,
    pub standings: LoadCounts,
}

pub struct Orchestrator<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> {
    store: &'a S,
    source: &'a F,
    pacing: Duration,
}

impl<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> Orchestrator<'a, S, F> {
    pub fn new(store: &'a S, source: &'a F, pacing: Duration) -> Self {
        Self {
            store,
            source,
            pacing,
        }
    }

    /// Backfill: every league crossed with the inclusive season range,
    /// seasons ascending, paced between feed calls.
    pub async fn run_historical(
        &self,
        leagues: &[String],
        start: Season,
        end: Season,
        refresh: bool,
        toggles: CategoryToggles,
    ) -> RunTotals {
        let seasons = Season::range(start, end);
        info!(
            leagues = leagues.len(),
            start = %start,
            end = %end,
            refresh,
            "historical load started"
        );
        let begun = Instant::now();
        let mut totals = RunTotals::default();

        for league in leagues {
            for season in &seasons {
                info!(league = %league, season = %season, "processing unit");
                if let Err(err) = self
                    .run_unit(league, season, refresh, toggles, true, &mut totals)
                    .await
                {
                    error!(
                        league = %league,
                        season = %season,
                        error = %format!("{err:#}"),
                        "unit failed; continuing with next"
                    );
                }
            }
        }

        log_summary("historical load", begun.elapsed(), &totals);
        totals
    }

    /// Daily refresh of one season (normally the current one) across the
    /// given leagues. Always bypasses the feed cache.
    pub async fn run_daily(
        &self,
        leagues: &[String],
        season: Season,
        toggles: CategoryToggles,
    ) -> RunTotals {
        info!(leagues = leagues.len(), season = %season, "daily update started");
        let begun = Instant::now();
        let mut totals = RunTotals::default();

        for league in leagues {
            info!(league = %league, season = %season, "updating");
            if let Err(err) = self
                .run_unit(league, &season, true, toggles, false, &mut totals)
                .await
            {
                error!(
                    league = %league,
                    error = %format!("{err:#}"),
                    "league update failed; continuing with next"
                );
            }
        }

        log_summary("daily update", begun.elapsed(), &totals);
        totals
    }

    /// One unit: the four loaders in fixed order. Totals accrue per loader
    /// so a late failure keeps the counts of the categories that landed.
    async fn run_unit(
        &self,
        league: &str,
        season: &Season,
        refresh: bool,
        toggles: CategoryToggles,
        pace: bool,
        totals: &mut RunTotals,
    ) -> Result<()> {
        if toggles.matches {
            totals.matches += MatchLoader::new(self.store, self.source)
                .load(league, season, refresh)
                .await?;
            self.pace(pace).await;
        }
        if toggles.team_stats {
            totals.team_stats += TeamStatsLoader::new(self.store, self.source)
                .load(league, season, None, refresh)
                .await?;
            self.pace(pace).await;
        }
        if toggles.player_stats {
            totals.player_stats += PlayerStatsLoader::new(self.store, self.source)
                .load(league, season, None, refresh)
                .await?;
            self.pace(pace).await;
        }
        if toggles.standings {
            totals.standings += StandingsLoader::new(self.store, self.source)
                .load(league, season, None, refresh)
                .await?;
            self.pace(pace).await;
        }
        Ok(())
    }

    async fn pace(&self, pace: bool) {
        if pace && !self.pacing.is_zero() {
            sleep(self.pacing).await;
        }
    }
}

fn log_summary(run: &str, elapsed: Duration, totals: &RunTotals) {
    info!(
        run,
        elapsed_secs = elapsed.as_secs(),
        matches = %totals.matches,
        team_stats = %totals.team_stats,
        player_stats = %totals.player_stats,
        standings = %totals.standings,
        "run complete"
    );
}
