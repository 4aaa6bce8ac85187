//! Load provenance: every ingestion unit opens a durable load record,
//! overwrites its progress counters, and closes it exactly once with a
//! terminal status.

use anyhow::Result;
use tracing::{error, info, warn};

use super::{LoadStatus, Storage};

/// Tracks the lifecycle of one load record at a time. The held id is
/// cleared on close, so a terminal record can never be re-opened or
/// double-closed through this handle.
pub struct LoadTracker<'a, S: Storage + ?Sized> {
    store: &'a S,
    load_id: Option<i64>,
}

impl<'a, S: Storage + ?Sized> LoadTracker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            load_id: None,
        }
    }

    /// Open a running load record. The source name is resolved against
    /// `data_sources`; an unregistered source records a null source id.
    pub async fn start(
        &mut self,
        source_name: &str,
        load_type: &str,
        target_table: &str,
        league_season_id: Option<i64>,
    ) -> Result<i64> {
        let source_id = self.store.source_id(source_name).await?;
        let load_id = self
            .store
            .open_load(source_id, load_type, target_table, league_season_id)
            .await?;
        self.load_id = Some(load_id);
        info!(load_id, load_type, target_table, source = %source_name, "load started");
        Ok(load_id)
    }

    /// Overwrite the progress counters. No-op when no load is open.
    pub async fn progress(
        &self,
        processed: i64,
        inserted: i64,
        updated: i64,
        failed: i64,
    ) -> Result<()> {
        let Some(load_id) = self.load_id else {
            return Ok(());
        };
        self.store
            .record_load_progress(load_id, processed, inserted, updated, failed)
            .await
    }

    /// Close the open load as completed. On a write error the id is
    /// retained so the caller can still mark the load failed.
    pub async fn complete(&mut self) -> Result<()> {
        let Some(load_id) = self.load_id else {
            return Ok(());
        };
        self.store
            .close_load(load_id, LoadStatus::Completed, None)
            .await?;
        self.load_id = None;
        info!(load_id, "load completed");
        Ok(())
    }

    /// Close the open load as failed, recording the message. Best effort:
    /// a secondary storage error here is logged and swallowed so the
    /// original failure stays the one that propagates.
    pub async fn fail(&mut self, message: &str) {
        let Some(load_id) = self.load_id.take() else {
            return;
        };
        error!(load_id, error = %message, "load failed");
        if let Err(close_err) = self
            .store
            .close_load(load_id, LoadStatus::Failed, Some(message))
            .await
        {
            warn!(load_id, error = %format!("{close_err:#}"), "could not mark load failed");
        }
    }
}
