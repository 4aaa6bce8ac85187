//! Feed collaborator boundary. The engine only ever sees ordered tabular
//! rows keyed by whatever column names the source happens to publish; the
//! normalizer's alias chains are the sole contract with this side.

pub mod http;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

use crate::config::Season;
use crate::normalize::StatCategory;

/// One feed row: column name → JSON value, in published column order.
pub type FeedRow = IndexMap<String, serde_json::Value>;

/// One category's result set for a (league, season) request.
pub type FeedTable = Vec<FeedRow>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("feed transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("feed payload could not be decoded: {0}")]
    Decode(String),
}

/// Black-box producer of tabular rows per category. `refresh` asks the
/// source to bypass any cache it keeps.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Source name as registered in `data_sources`; lowercased it prefixes
    /// deterministic external identifiers.
    fn name(&self) -> &str;

    async fn schedule(
        &self,
        league_code: &str,
        season: &Season,
        refresh: bool,
    ) -> Result<FeedTable, SourceError>;

    async fn team_season_stats(
        &self,
        league_code: &str,
        season: &Season,
        category: StatCategory,
        refresh: bool,
    ) -> Result<FeedTable, SourceError>;

    async fn player_season_stats(
        &self,
        league_code: &str,
        season: &Season,
        category: StatCategory,
        refresh: bool,
    ) -> Result<FeedTable, SourceError>;

    async fn league_table(
        &self,
        league_code: &str,
        season: &Season,
        refresh: bool,
    ) -> Result<FeedTable, SourceError>;
}
