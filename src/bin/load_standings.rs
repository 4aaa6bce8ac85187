use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use football_db::config::{IngestConfig, Season};
use football_db::loaders::standings::StandingsLoader;
use football_db::logging::init_tracing;
use football_db::source::http::HttpFeedClient;
use football_db::store::PgStorage;
use football_db::util::env as env_util;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "load_standings",
    about = "Load league standings snapshots into the database"
)]
struct Args {
    /// League code(s), e.g. "ENG-Premier League"
    #[arg(long = "league", required = true)]
    leagues: Vec<String>,
    /// Season label, e.g. 2023-2024
    #[arg(long)]
    season: Season,
    /// Snapshot date (YYYY-MM-DD, default: today)
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Bypass the feed cache
    #[arg(long, default_value_t = false)]
    force_refresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing("info,sqlx=warn")?;
    let args = Args::parse();
    let cfg = IngestConfig::from_env()?;

    let store = PgStorage::connect(
        &env_util::db_url()?,
        &cfg.schema,
        cfg.db_min_conns,
        cfg.db_max_conns,
    )
    .await?;
    let source = HttpFeedClient::from_env()?;

    let loader = StandingsLoader::new(&store, &source);
    for league in &args.leagues {
        let counts = loader
            .load(league, &args.season, args.date, args.force_refresh)
            .await?;
        info!(league = %league, season = %args.season, %counts, "standings load complete");
    }
    Ok(())
}
