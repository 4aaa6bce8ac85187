//! In-memory `Storage` fake for tests: natural-key upserts over hash maps,
//! surrogate id counters, and a load log that mirrors the real table.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::upsert::{resolve_update_columns, SqlValue, UpsertReport, UpsertRequest};
use super::{LoadStatus, PlayerAttrs, Storage};

#[derive(Debug, Clone)]
pub struct LoadRecord {
    pub id: i64,
    pub source_id: Option<i64>,
    pub load_type: String,
    pub target_table: String,
    pub league_season_id: Option<i64>,
    pub status: LoadStatus,
    pub error_message: Option<String>,
    pub processed: i64,
    pub inserted: i64,
    pub updated: i64,
    pub failed: i64,
}

pub type StoredRow = HashMap<String, SqlValue>;

#[derive(Default)]
struct Inner {
    league_seasons: HashMap<(String, String), i64>,
    sources: HashMap<String, i64>,
    teams: Vec<(i64, String, Option<String>)>,
    players: Vec<(i64, String, PlayerAttrs)>,
    tables: HashMap<String, Vec<(Vec<String>, StoredRow)>>,
    loads: Vec<LoadRecord>,
    next_id: i64,
}

impl Inner {
    fn next(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemStorage {
    inner: Mutex<Inner>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_league_season(&self, league_code: &str, season_name: &str, id: i64) {
        self.inner
            .lock()
            .unwrap()
            .league_seasons
            .insert((league_code.to_string(), season_name.to_string()), id);
    }

    pub fn seed_source(&self, name: &str, id: i64) {
        self.inner.lock().unwrap().sources.insert(name.to_string(), id);
    }

    pub fn rows(&self, table: &str) -> Vec<StoredRow> {
        self.inner
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|(_, r)| r.clone()).collect())
            .unwrap_or_default()
    }

    pub fn loads(&self) -> Vec<LoadRecord> {
        self.inner.lock().unwrap().loads.clone()
    }

    pub fn teams(&self) -> Vec<(i64, String, Option<String>)> {
        self.inner.lock().unwrap().teams.clone()
    }

    pub fn players(&self) -> Vec<(i64, String, PlayerAttrs)> {
        self.inner.lock().unwrap().players.clone()
    }
}

fn key_of(value: &SqlValue) -> String {
    match value {
        SqlValue::BigInt(i) => i.to_string(),
        SqlValue::Float(f) => f.to_string(),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Bool(b) => b.to_string(),
        SqlValue::Date(d) => d.to_string(),
        SqlValue::Timestamp(ts) => ts.to_rfc3339(),
        SqlValue::Json(j) => j.to_string(),
        SqlValue::Null => "\0null".to_string(),
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn league_season_id(
        &self,
        league_code: &str,
        season_name: &str,
    ) -> Result<Option<i64>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .league_seasons
            .get(&(league_code.to_string(), season_name.to_string()))
            .copied())
    }

    async fn get_or_create_team(&self, name: &str, country: Option<&str>) -> Result<i64> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((id, _, _)) = inner.teams.iter().find(|(_, n, _)| n == name) {
            return Ok(*id);
        }
        let id = inner.next();
        inner
            .teams
            .push((id, name.to_string(), country.map(str::to_string)));
        Ok(id)
    }

    async fn get_or_create_player(&self, name: &str, attrs: &PlayerAttrs) -> Result<i64> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((id, _, _)) = inner.players.iter().find(|(_, n, _)| n == name) {
            return Ok(*id);
        }
        let id = inner.next();
        inner.players.push((id, name.to_string(), attrs.clone()));
        Ok(id)
    }

    async fn upsert(&self, req: UpsertRequest<'_>) -> Result<UpsertReport> {
        if req.rows.is_empty() {
            return Ok(UpsertReport::default());
        }
        let update_columns =
            resolve_update_columns(req.columns, req.conflict_columns, req.update_columns);

        let mut inner = self.inner.lock().unwrap();
        let table = inner.tables.entry(req.table.to_string()).or_default();
        let mut report = UpsertReport::default();

        for row in &req.rows {
            anyhow::ensure!(
                row.len() == req.columns.len(),
                "row arity mismatch for {}",
                req.table
            );
            let by_name: StoredRow = req
                .columns
                .iter()
                .zip(row.iter())
                .map(|(c, v)| (c.to_string(), v.clone()))
                .collect();
            let key: Vec<String> = req
                .conflict_columns
                .iter()
                .map(|c| key_of(&by_name[*c]))
                .collect();

            if let Some((_, existing)) = table.iter_mut().find(|(k, _)| *k == key) {
                for col in &update_columns {
                    existing.insert(col.to_string(), by_name[*col].clone());
                }
                report.updated += 1;
            } else {
                table.push((key, by_name));
                report.inserted += 1;
            }
        }
        Ok(report)
    }

    async fn source_id(&self, source_name: &str) -> Result<Option<i64>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sources
            .get(source_name)
            .copied())
    }

    async fn open_load(
        &self,
        source_id: Option<i64>,
        load_type: &str,
        target_table: &str,
        league_season_id: Option<i64>,
    ) -> Result<i64> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next();
        inner.loads.push(LoadRecord {
            id,
            source_id,
            load_type: load_type.to_string(),
            target_table: target_table.to_string(),
            league_season_id,
            status: LoadStatus::Running,
            error_message: None,
            processed: 0,
            inserted: 0,
            updated: 0,
            failed: 0,
        });
        Ok(id)
    }

    async fn record_load_progress(
        &self,
        load_id: i64,
        processed: i64,
        inserted: i64,
        updated: i64,
        failed: i64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let load = inner
            .loads
            .iter_mut()
            .find(|l| l.id == load_id)
            .ok_or_else(|| anyhow::anyhow!("unknown load {load_id}"))?;
        load.processed = processed;
        load.inserted = inserted;
        load.updated = updated;
        load.failed = failed;
        Ok(())
    }

    async fn close_load(
        &self,
        load_id: i64,
        status: LoadStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let load = inner
            .loads
            .iter_mut()
            .find(|l| l.id == load_id)
            .ok_or_else(|| anyhow::anyhow!("unknown load {load_id}"))?;
        load.status = status;
        load.error_message = error_message.map(str::to_string);
        Ok(())
    }
}
