//! Match schedule/result loader. The natural key deliberately excludes the
//! score columns, so a rerun after kickoff updates the fixture in place.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use super::{finish_load, LoadCounts, RowError};
use crate::config::Season;
use crate::normalize::{alias_str, coerce_int, first_alias, truncate_chars};
use crate::source::{FeedRow, FeedSource, FeedTable};
use crate::store::{LoadTracker, SqlValue, Storage, UpsertReport, UpsertRequest};

const MATCH_COLUMNS: &[&str] = &[
    "league_season_id",
    "home_team_id",
    "away_team_id",
    "match_date",
    "matchweek",
    "home_score",
    "away_score",
    "home_halftime_score",
    "away_halftime_score",
    "attendance",
    "venue",
    "referee",
    "match_status",
    "external_match_id",
];

const MATCH_CONFLICT: &[&str] = &[
    "league_season_id",
    "home_team_id",
    "away_team_id",
    "match_date",
];

// Scores and context refresh on rerun; the identifying columns never move.
const MATCH_UPDATE: &[&str] = &[
    "matchweek",
    "home_score",
    "away_score",
    "attendance",
    "venue",
    "referee",
    "match_status",
];

const HOME_ALIASES: &[&str] = &["home_team", "Home"];
const AWAY_ALIASES: &[&str] = &["away_team", "Away"];
const DATE_ALIASES: &[&str] = &["date", "Date"];

pub struct MatchLoader<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> {
    store: &'a S,
    source: &'a F,
}

impl<'a, S: Storage + ?Sized, F: FeedSource + ?Sized> MatchLoader<'a, S, F> {
    pub fn new(store: &'a S, source: &'a F) -> Self {
        Self { store, source }
    }

    pub async fn load(
        &self,
        league_code: &str,
        season: &Season,
        refresh: bool,
    ) -> Result<LoadCounts> {
        info!(league = %league_code, season = %season, "loading matches");

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
                "matches_load",
                "matches",
                Some(league_season_id),
            )
            .await?;

        let table = match self.source.schedule(league_code, season, refresh).await {
            Ok(table) => table,
            Err(err) => {
                tracker.fail(&err.to_string()).await;
                return Err(err.into());
            }
        };
        if table.is_empty() {
            warn!(league = %league_code, season = %season, "no matches found");
            tracker.complete().await?;
            return Ok(LoadCounts::default());
        }
        info!(count = table.len(), "fetched match schedule");

        let counts = self.process_rows(&table, league_season_id).await;
        if let Err(err) = finish_load(&mut tracker, table.len(), &counts).await {
            tracker.fail(&format!("{err:#}")).await;
            return Err(err);
        }
        info!(league = %league_code, season = %season, %counts, "match processing complete");
        Ok(counts)
    }

    async fn process_rows(&self, table: &FeedTable, league_season_id: i64) -> LoadCounts {
        let mut counts = LoadCounts::default();
        for (idx, row) in table.iter().enumerate() {
            match self.process_row(row, league_season_id).await {
                Ok(report) => counts.absorb(&report),
                Err(err) => {
                    warn!(row = idx, error = %err, "skipping match row");
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
    ) -> Result<UpsertReport, RowError> {
        let home_team = alias_str(row, HOME_ALIASES).ok_or(RowError::MissingTeam)?;
        let away_team = alias_str(row, AWAY_ALIASES).ok_or(RowError::MissingTeam)?;
        let date_raw = first_alias(row, DATE_ALIASES).ok_or(RowError::MissingDate)?;
        let match_date = parse_match_date(date_raw)?;

        let home_team_id = self.store.get_or_create_team(&home_team, None).await?;
        let away_team_id = self.store.get_or_create_team(&away_team, None).await?;

        let (home_score, away_score) = parse_score(
            first_alias(row, &["home_score", "Score"]),
            first_alias(row, &["away_score", "Score"]),
        );
        let match_status = if home_score.is_some() {
            "completed"
        } else {
            "scheduled"
        };

        let matchweek = first_alias(row, &["matchweek", "Week"]).and_then(coerce_int);
        let venue = alias_str(row, &["venue", "Venue"]).map(|s| truncate_chars(&s, 100));
        let referee = alias_str(row, &["referee", "Referee"]).map(|s| truncate_chars(&s, 100));
        let attendance = first_alias(row, &["attendance", "Attendance"]).and_then(coerce_int);

        let external_match_id = format!(
            "{}_{}_{}_{}_{}",
            self.source.name().to_ascii_lowercase(),
            league_season_id,
            home_team,
            away_team,
            match_date.date_naive()
        );

        let values = vec![
            SqlValue::BigInt(league_season_id),
            SqlValue::BigInt(home_team_id),
            SqlValue::BigInt(away_team_id),
            SqlValue::Timestamp(match_date),
            SqlValue::opt_int(matchweek),
            SqlValue::opt_int(home_score),
            SqlValue::opt_int(away_score),
            SqlValue::Null, // home_halftime_score: not published by the feed
            SqlValue::Null, // away_halftime_score
            SqlValue::opt_int(attendance),
            SqlValue::opt_text(venue),
            SqlValue::opt_text(referee),
            SqlValue::Text(match_status.to_string()),
            SqlValue::Text(external_match_id),
        ];

        let report = self
            .store
            .upsert(UpsertRequest {
                table: "matches",
                columns: MATCH_COLUMNS,
                rows: vec![values],
                conflict_columns: MATCH_CONFLICT,
                update_columns: Some(MATCH_UPDATE),
            })
            .await?;
        Ok(report)
    }
}

/// Scores arrive either as one composite cell ("2–1", en dash or hyphen) or
/// as separate numeric home/away columns. Anything else is "not played".
pub(crate) fn parse_score(
    home: Option<&Value>,
    away: Option<&Value>,
) -> (Option<i64>, Option<i64>) {
    if let Some(Value::String(s)) = home {
        for sep in ['\u{2013}', '-'] {
            if let Some((h, a)) = s.split_once(sep) {
                return (
                    h.trim().parse::<i64>().ok(),
                    a.trim().parse::<i64>().ok(),
                );
            }
        }
    }
    match (home.and_then(coerce_int), away.and_then(coerce_int)) {
        (Some(h), Some(a)) => (Some(h), Some(a)),
        _ => (None, None),
    }
}

/// Accepts the date renderings the feed has been seen to publish: bare
/// dates, space or `T` separated date-times, and RFC 3339.
fn parse_match_date(v: &Value) -> Result<DateTime<Utc>, RowError> {
    let raw = match v {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
    }
    Err(RowError::BadDate(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::ScriptedFeed;
    use crate::store::mem::MemStorage;
    use crate::store::LoadStatus;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> FeedRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn parses_composite_and_split_scores() {
        let (h, a) = parse_score(Some(&json!("2\u{2013}1")), Some(&json!("2\u{2013}1")));
        assert_eq!((h, a), (Some(2), Some(1)));

        let (h, a) = parse_score(Some(&json!("0-0")), None);
        assert_eq!((h, a), (Some(0), Some(0)));

        let (h, a) = parse_score(Some(&json!(3)), Some(&json!(2)));
        assert_eq!((h, a), (Some(3), Some(2)));

        assert_eq!(parse_score(Some(&json!(3)), None), (None, None));
        assert_eq!(parse_score(None, None), (None, None));
    }

    #[test]
    fn parses_published_date_shapes() {
        for raw in [
            json!("2023-10-01"),
            json!("2023-10-01 15:00:00"),
            json!("2023-10-01T15:00:00+00:00"),
        ] {
            assert!(parse_match_date(&raw).is_ok(), "failed on {raw}");
        }
        assert!(matches!(
            parse_match_date(&json!("next saturday")),
            Err(RowError::BadDate(_))
        ));
    }

    fn fixture(home: &str, away: &str, score: Option<&str>) -> FeedRow {
        let mut pairs = vec![
            ("Home", json!(home)),
            ("Away", json!(away)),
            ("Date", json!("2023-10-01")),
            ("Venue", json!("Emirates Stadium")),
        ];
        if let Some(s) = score {
            pairs.push(("Score", json!(s)));
        }
        row(&pairs)
    }

    #[tokio::test]
    async fn scheduled_match_gains_score_in_place_on_rerun() {
        let store = MemStorage::new();
        store.seed_league_season("ENG-Premier League", "2023-2024", 10);
        let season: Season = "2023-2024".parse().unwrap();

        let feed =
            ScriptedFeed::new("FBref").with_schedule(
                "ENG-Premier League",
                "2023-2024",
                vec![fixture("Arsenal", "Chelsea", None)],
            );
        let loader = MatchLoader::new(&store, &feed);
        let first = loader.load("ENG-Premier League", &season, false).await.unwrap();
        assert_eq!(first.inserted, 1);

        let rows = store.rows("matches");
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0]["match_status"],
            SqlValue::Text("scheduled".into())
        );

        // Same fixture, now played: the existing row flips to completed.
        let feed = ScriptedFeed::new("FBref").with_schedule(
            "ENG-Premier League",
            "2023-2024",
            vec![fixture("Arsenal", "Chelsea", Some("2\u{2013}1"))],
        );
        let loader = MatchLoader::new(&store, &feed);
        let second = loader.load("ENG-Premier League", &season, true).await.unwrap();
        assert_eq!(second.updated, 1);
        assert_eq!(second.inserted, 0);

        let rows = store.rows("matches");
        assert_eq!(rows.len(), 1, "rerun must not duplicate the fixture");
        assert_eq!(rows[0]["match_status"], SqlValue::Text("completed".into()));
        assert_eq!(rows[0]["home_score"], SqlValue::BigInt(2));
        assert_eq!(rows[0]["away_score"], SqlValue::BigInt(1));
    }

    #[tokio::test]
    async fn missing_unit_short_circuits_without_a_load_record() {
        let store = MemStorage::new();
        let feed = ScriptedFeed::new("FBref");
        let loader = MatchLoader::new(&store, &feed);
        let season: Season = "2023-2024".parse().unwrap();

        let counts = loader.load("XYZ-Nowhere League", &season, false).await.unwrap();
        assert_eq!(counts, LoadCounts::default());
        assert!(store.loads().is_empty());
    }

    #[tokio::test]
    async fn bad_rows_are_counted_not_fatal() {
        let store = MemStorage::new();
        store.seed_league_season("ENG-Premier League", "2023-2024", 10);
        let season: Season = "2023-2024".parse().unwrap();

        let mut bad = fixture("Leeds United", "Everton", None);
        bad.shift_remove("Away");
        let feed = ScriptedFeed::new("FBref").with_schedule(
            "ENG-Premier League",
            "2023-2024",
            vec![
                fixture("Arsenal", "Chelsea", Some("1\u{2013}1")),
                bad,
                fixture("Liverpool", "Spurs", None),
            ],
        );
        let loader = MatchLoader::new(&store, &feed);
        let counts = loader.load("ENG-Premier League", &season, false).await.unwrap();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.inserted + counts.updated, 2);

        let load = &store.loads()[0];
        assert_eq!(load.status, LoadStatus::Completed);
        assert_eq!(load.processed, 3);
        assert_eq!(load.failed, 1);
    }

    #[tokio::test]
    async fn source_failure_marks_load_failed_and_propagates() {
        let store = MemStorage::new();
        store.seed_league_season("ENG-Premier League", "2023-2024", 10);
        let season: Season = "2023-2024".parse().unwrap();

        let feed = ScriptedFeed::new("FBref").failing_schedule();
        let loader = MatchLoader::new(&store, &feed);
        let result = loader.load("ENG-Premier League", &season, false).await;
        assert!(result.is_err());

        let loads = store.loads();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].status, LoadStatus::Failed);
        assert!(loads[0].error_message.is_some());
    }
}
