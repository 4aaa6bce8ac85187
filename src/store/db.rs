use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::{info, instrument};

use super::upsert::{conflict_clause, resolve_update_columns, SqlValue, UpsertReport, UpsertRequest};
use super::{LoadStatus, PlayerAttrs, Storage};

/// Postgres-backed storage handle. Cheap to clone; owns only the bounded
/// pool. Constructed once per binary and passed by reference into every
/// component.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connect with a bounded pool and pin `search_path` to the configured
    /// schema on every session. All statements run unprepared so the engine
    /// stays safe behind transaction-mode poolers.
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(
        database_url: &str,
        schema: &str,
        min_connections: u32,
        max_connections: u32,
    ) -> Result<Self> {
        let connect_options = PgConnectOptions::from_str(database_url)
            .context("invalid database URL")?
            // PgBouncer txn mode safe
            .statement_cache_capacity(0);

        let search_path = format!("SET search_path TO {}, public", schema);
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .after_connect(move |conn, _meta| {
                let stmt = search_path.clone();
                Box::pin(async move {
                    sqlx::query(&stmt).execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect_with(connect_options)
            .await?;
        info!(schema, max_connections, "connected to db");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn league_season_id(
        &self,
        league_code: &str,
        season_name: &str,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT ls.league_season_id
             FROM league_seasons ls
             JOIN leagues l ON ls.league_id = l.league_id
             JOIN seasons s ON ls.season_id = s.season_id
             WHERE l.league_code = $1 AND s.season_name = $2",
        )
        .persistent(false)
        .bind(league_code)
        .bind(season_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get::<i64, _>("league_season_id")))
    }

    async fn get_or_create_team(&self, name: &str, country: Option<&str>) -> Result<i64> {
        if let Some(r) = sqlx::query("SELECT team_id FROM teams WHERE team_name = $1")
            .persistent(false)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(r.get::<i64, _>("team_id"));
        }

        let inserted =
            sqlx::query("INSERT INTO teams (team_name, country) VALUES ($1, $2) RETURNING team_id")
                .persistent(false)
                .bind(name)
                .bind(country)
                .fetch_one(&self.pool)
                .await?;
        info!(team = %name, "created new team");
        Ok(inserted.get("team_id"))
    }

    async fn get_or_create_player(&self, name: &str, attrs: &PlayerAttrs) -> Result<i64> {
        if let Some(r) = sqlx::query("SELECT player_id FROM players WHERE player_name = $1")
            .persistent(false)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(r.get::<i64, _>("player_id"));
        }

        let inserted = sqlx::query(
            "INSERT INTO players (player_name, nationality, position, birth_date)
             VALUES ($1, $2, $3, $4)
             RETURNING player_id",
        )
        .persistent(false)
        .bind(name)
        .bind(attrs.nationality.as_deref())
        .bind(attrs.position.as_deref())
        .bind(attrs.birth_date)
        .fetch_one(&self.pool)
        .await?;
        info!(player = %name, "created new player");
        Ok(inserted.get("player_id"))
    }

    async fn upsert(&self, req: UpsertRequest<'_>) -> Result<UpsertReport> {
        if req.rows.is_empty() {
            return Ok(UpsertReport::default());
        }
        for row in &req.rows {
            if row.len() != req.columns.len() {
                bail!(
                    "upsert into {}: row has {} values for {} columns",
                    req.table,
                    row.len(),
                    req.columns.len()
                );
            }
        }

        let update_columns =
            resolve_update_columns(req.columns, req.conflict_columns, req.update_columns);

        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) ",
            req.table,
            req.columns.join(", ")
        ));
        qb.push_values(&req.rows, |mut b, row| {
            for v in row {
                match v {
                    SqlValue::BigInt(i) => b.push_bind(*i),
                    SqlValue::Float(f) => b.push_bind(*f),
                    SqlValue::Text(s) => b.push_bind(s.clone()),
                    SqlValue::Bool(x) => b.push_bind(*x),
                    SqlValue::Date(d) => b.push_bind(*d),
                    SqlValue::Timestamp(ts) => b.push_bind(*ts),
                    SqlValue::Json(j) => b.push_bind(j.clone()),
                    // Literal NULL so the column, not the parameter, fixes
                    // the type.
                    SqlValue::Null => b.push("NULL"),
                };
            }
        });
        qb.push(conflict_clause(req.conflict_columns, &update_columns));

        // xmax = 0 distinguishes a fresh insert from a conflict update.
        let outcomes = qb.build().persistent(false).fetch_all(&self.pool).await?;
        let mut report = UpsertReport::default();
        for row in outcomes {
            if row.try_get::<bool, _>("inserted").unwrap_or(false) {
                report.inserted += 1;
            } else {
                report.updated += 1;
            }
        }
        Ok(report)
    }

    async fn source_id(&self, source_name: &str) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT source_id FROM data_sources WHERE source_name = $1")
            .persistent(false)
            .bind(source_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>("source_id")))
    }

    async fn open_load(
        &self,
        source_id: Option<i64>,
        load_type: &str,
        target_table: &str,
        league_season_id: Option<i64>,
    ) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO data_load_log
                 (source_id, load_type, target_table, league_season_id, load_start, status)
             VALUES ($1, $2, $3, $4, $5, 'running')
             RETURNING load_id",
        )
        .persistent(false)
        .bind(source_id)
        .bind(load_type)
        .bind(target_table)
        .bind(league_season_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("load_id"))
    }

    async fn record_load_progress(
        &self,
        load_id: i64,
        processed: i64,
        inserted: i64,
        updated: i64,
        failed: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE data_load_log
             SET records_processed = $1,
                 records_inserted = $2,
                 records_updated = $3,
                 records_failed = $4
             WHERE load_id = $5",
        )
        .persistent(false)
        .bind(processed)
        .bind(inserted)
        .bind(updated)
        .bind(failed)
        .bind(load_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close_load(
        &self,
        load_id: i64,
        status: LoadStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE data_load_log
             SET load_end = $1, status = $2, error_message = $3
             WHERE load_id = $4",
        )
        .persistent(false)
        .bind(Utc::now())
        .bind(status.as_str())
        .bind(error_message)
        .bind(load_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
