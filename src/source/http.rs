//! HTTP-backed feed client. Endpoints serve a JSON array of flat objects
//! per category; column naming is entirely the server's business.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{FeedRow, FeedSource, FeedTable, SourceError};
use crate::config::Season;
use crate::normalize::StatCategory;
use crate::util::env::env_opt;

pub struct HttpFeedClient {
    http: Client,
    base: String,
    name: String,
}

impl HttpFeedClient {
    pub fn new(base: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            name: name.into(),
        }
    }

    /// Build from `FEED_BASE_URL` (+ optional `FEED_SOURCE_NAME`).
    pub fn from_env() -> anyhow::Result<Self> {
        let base = env_opt("FEED_BASE_URL")
            .ok_or_else(|| anyhow::anyhow!("FEED_BASE_URL is not configured"))?;
        let name = env_opt("FEED_SOURCE_NAME").unwrap_or_else(|| "FBref".to_string());
        Ok(Self::new(base, name))
    }

    async fn fetch(
        &self,
        endpoint: &str,
        league_code: &str,
        season: &Season,
        category: Option<StatCategory>,
        refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        let url = format!("{}/{}", self.base, endpoint);
        let season_label = season.label();
        let mut query: Vec<(&str, String)> = vec![
            ("league", league_code.to_string()),
            ("season", season_label),
        ];
        if let Some(cat) = category {
            query.push(("category", cat.as_str().to_string()));
        }
        if refresh {
            query.push(("refresh", "true".to_string()));
        }

        debug!(%url, league = %league_code, season = %season, category = ?category, refresh, "feed request");
        let resp = self.http.get(&url).query(&query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let payload: Value = resp.json().await?;
        decode_table(payload)
    }
}

/// Rows must be a JSON array of objects; anything else is a decode error.
fn decode_table(payload: Value) -> Result<FeedTable, SourceError> {
    let Value::Array(items) = payload else {
        return Err(SourceError::Decode("expected a top-level array".into()));
    };
    let mut table = FeedTable::with_capacity(items.len());
    for item in items {
        let Value::Object(obj) = item else {
            return Err(SourceError::Decode("expected an array of objects".into()));
        };
        table.push(obj.into_iter().collect::<FeedRow>());
    }
    Ok(table)
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn schedule(
        &self,
        league_code: &str,
        season: &Season,
        refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        self.fetch("schedule", league_code, season, None, refresh).await
    }

    async fn team_season_stats(
        &self,
        league_code: &str,
        season: &Season,
        category: StatCategory,
        refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        self.fetch("team-season-stats", league_code, season, Some(category), refresh)
            .await
    }

    async fn player_season_stats(
        &self,
        league_code: &str,
        season: &Season,
        category: StatCategory,
        refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        self.fetch("player-season-stats", league_code, season, Some(category), refresh)
            .await
    }

    async fn league_table(
        &self,
        league_code: &str,
        season: &Season,
        refresh: bool,
    ) -> Result<FeedTable, SourceError> {
        self.fetch("league-table", league_code, season, None, refresh)
            .await
    }
}
