//! Storage collaborator: the narrow write-path interface the engine needs
//! from the relational store, plus its Postgres implementation. Every
//! schema object referenced here pre-exists; nothing migrates.

pub mod db;
pub mod load_log;
pub mod upsert;

#[cfg(test)]
pub mod mem;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use db::PgStorage;
pub use load_log::LoadTracker;
pub use upsert::{SqlValue, UpsertReport, UpsertRequest};

/// Optional player attributes captured on first sighting. Only applied at
/// creation; an existing player row is never amended by resolution.
#[derive(Debug, Clone, Default)]
pub struct PlayerAttrs {
    pub nationality: Option<String>,
    pub position: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Lifecycle state of a load record. `Partial` is a reserved terminal
/// value: accepted everywhere, produced nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Running,
    Completed,
    Failed,
    Partial,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Running => "running",
            LoadStatus::Completed => "completed",
            LoadStatus::Failed => "failed",
            LoadStatus::Partial => "partial",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadStatus::Running)
    }
}

/// Write-path storage interface. Identity resolution is exact-match by
/// name: a miss creates, never fails, and two spellings of one real-world
/// entity stay two rows by design.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Surrogate id for a (league code, season label) pair, if the
    /// reference data knows it.
    async fn league_season_id(
        &self,
        league_code: &str,
        season_name: &str,
    ) -> Result<Option<i64>>;

    async fn get_or_create_team(&self, name: &str, country: Option<&str>) -> Result<i64>;

    async fn get_or_create_player(&self, name: &str, attrs: &PlayerAttrs) -> Result<i64>;

    async fn upsert(&self, req: UpsertRequest<'_>) -> Result<UpsertReport>;

    /// `data_sources` lookup by name; unknown sources record a null id.
    async fn source_id(&self, source_name: &str) -> Result<Option<i64>>;

    /// Insert a running load record, returning its id.
    async fn open_load(
        &self,
        source_id: Option<i64>,
        load_type: &str,
        target_table: &str,
        league_season_id: Option<i64>,
    ) -> Result<i64>;

    /// Overwrite (not accumulate) the progress counters of a load.
    async fn record_load_progress(
        &self,
        load_id: i64,
        processed: i64,
        inserted: i64,
        updated: i64,
        failed: i64,
    ) -> Result<()>;

    /// Stamp the end time and terminal status of a load.
    async fn close_load(
        &self,
        load_id: i64,
        status: LoadStatus,
        error_message: Option<&str>,
    ) -> Result<()>;
}
