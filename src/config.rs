use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};

use crate::util::env::{env_opt, env_parse};

/// A football season, identified by its starting calendar year and labelled
/// the way the upstream reference data labels it (`2020-2021`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// The label used as `seasons.season_name` in the store.
    pub fn label(&self) -> String {
        format!("{}-{}", self.start_year, self.start_year + 1)
    }

    /// Inclusive ascending range of seasons.
    pub fn range(start: Season, end: Season) -> Vec<Season> {
        (start.start_year..=end.start_year).map(Season::new).collect()
    }

    /// Season in progress on `today`. The European season runs August to
    /// May, so before August the season started the previous calendar year.
    pub fn current(today: NaiveDate) -> Season {
        let year = today.year();
        if today.month() < 8 {
            Season::new(year - 1)
        } else {
            Season::new(year)
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_year, self.start_year + 1)
    }
}

impl FromStr for Season {
    type Err = anyhow::Error;

    /// Accepts `2020-2021` or a bare starting year `2020`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((a, b)) = s.split_once('-') {
            let start: i32 = a.parse()?;
            let end: i32 = b.parse()?;
            if end != start + 1 {
                bail!("invalid season label {s:?}: expected consecutive years");
            }
            return Ok(Season::new(start));
        }
        Ok(Season::new(s.parse()?))
    }
}

/// Run-wide settings, sourced from the environment (with `.env` support).
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// League codes processed in order when the caller does not name any.
    pub leagues: Vec<String>,
    pub start_season: Season,
    pub end_season: Season,
    /// Delay between consecutive feed calls during backfills.
    pub pacing: Duration,
    pub db_min_conns: u32,
    pub db_max_conns: u32,
    /// Schema placed at the front of `search_path` on every connection.
    pub schema: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            leagues: vec!["ENG-Premier League".to_string()],
            start_season: Season::new(2020),
            end_season: Season::new(2024),
            pacing: Duration::from_secs(2),
            db_min_conns: 2,
            db_max_conns: 10,
            schema: "football".to_string(),
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let leagues = match env_opt("LEAGUES") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.leagues,
        };
        let start_season = match env_opt("SEASON_START") {
            Some(raw) => raw.parse()?,
            None => defaults.start_season,
        };
        let end_season = match env_opt("SEASON_END") {
            Some(raw) => raw.parse()?,
            None => defaults.end_season,
        };
        if end_season < start_season {
            bail!(
                "SEASON_END ({}) precedes SEASON_START ({})",
                end_season,
                start_season
            );
        }
        Ok(Self {
            leagues,
            start_season,
            end_season,
            pacing: Duration::from_secs(env_parse("PACING_SECS", 2u64)),
            db_min_conns: env_parse("DB_MIN_CONNS", defaults.db_min_conns),
            db_max_conns: env_parse("DB_MAX_CONNS", defaults.db_max_conns),
            schema: env_opt("FOOTBALL_SCHEMA").unwrap_or(defaults.schema),
        })
    }
}
