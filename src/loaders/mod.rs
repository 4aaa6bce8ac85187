//! Category loaders: each drives one feed category through
//! normalize → resolve → upsert, wrapped in load provenance. A bad row
//! costs exactly one `failed` count, never the batch.

pub mod matches;
pub mod player_stats;
pub mod standings;
pub mod team_stats;

use std::fmt;
use std::ops::AddAssign;

use anyhow::Result;
use thiserror::Error;

use crate::store::{LoadTracker, Storage, UpsertReport};

/// Per-invocation outcome counts returned by every loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadCounts {
    pub inserted: u64,
    pub updated: u64,
    pub failed: u64,
}

impl LoadCounts {
    pub(crate) fn absorb(&mut self, report: &UpsertReport) {
        self.inserted += report.inserted;
        self.updated += report.updated;
    }
}

impl AddAssign for LoadCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.updated += rhs.updated;
        self.failed += rhs.failed;
    }
}

impl fmt::Display for LoadCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} failed",
            self.inserted, self.updated, self.failed
        )
    }
}

/// Why a single row was skipped. Counted and logged with row context;
/// never aborts the surrounding batch.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("missing team name")]
    MissingTeam,
    #[error("missing player name")]
    MissingPlayer,
    #[error("missing match date")]
    MissingDate,
    #[error("unparsable match date {0:?}")]
    BadDate(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Write final progress and close the load as completed. On error the
/// tracker still holds the load id so the caller can mark it failed.
pub(crate) async fn finish_load<S: Storage + ?Sized>(
    tracker: &mut LoadTracker<'_, S>,
    processed: usize,
    counts: &LoadCounts,
) -> Result<()> {
    tracker
        .progress(
            processed as i64,
            counts.inserted as i64,
            counts.updated as i64,
            counts.failed as i64,
        )
        .await?;
    tracker.complete().await
}
