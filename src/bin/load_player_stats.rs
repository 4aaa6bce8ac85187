use anyhow::Result;
use clap::Parser;
use football_db::config::{IngestConfig, Season};
use football_db::loaders::player_stats::PlayerStatsLoader;
use football_db::logging::init_tracing;
use football_db::normalize::StatCategory;
use football_db::source::http::HttpFeedClient;
use football_db::store::PgStorage;
use football_db::util::env as env_util;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "load_player_stats",
    about = "Load player season statistics into the database"
)]
struct Args {
    /// League code(s), e.g. "ENG-Premier League"
    #[arg(long = "league", required = true)]
    leagues: Vec<String>,
    /// Season label, e.g. 2023-2024
    #[arg(long)]
    season: Season,
    /// Stat categories to load (default: all except goalkeeping)
    #[arg(long = "stat-type", value_name = "CATEGORY")]
    stat_types: Vec<StatCategory>,
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

    let categories = if args.stat_types.is_empty() {
        None
    } else {
        Some(args.stat_types.as_slice())
    };
    let loader = PlayerStatsLoader::new(&store, &source);
    for league in &args.leagues {
        let counts = loader
            .load(league, &args.season, categories, args.force_refresh)
            .await?;
        info!(league = %league, season = %args.season, %counts, "player stats load complete");
    }
    Ok(())
}
