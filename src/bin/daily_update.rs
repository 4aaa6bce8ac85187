use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use football_db::config::{IngestConfig, Season};
use football_db::logging::init_tracing;
use football_db::orchestrator::{CategoryToggles, Orchestrator};
use football_db::source::http::HttpFeedClient;
use football_db::store::PgStorage;
use football_db::util::env as env_util;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "daily_update",
    about = "Refresh the current season's matches, statistics and standings"
)]
struct Args {
    /// League code(s) to update (default: configured league list)
    #[arg(long = "league")]
    leagues: Vec<String>,
    /// Season to update (default: auto-detected current season)
    #[arg(long)]
    season: Option<Season>,
    /// Skip updating match data
    #[arg(long, default_value_t = false)]
    no_matches: bool,
    /// Skip updating team and player statistics
    #[arg(long, default_value_t = false)]
    no_stats: bool,
    /// Skip updating league standings
    #[arg(long, default_value_t = false)]
    no_standings: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing("info,sqlx=warn")?;
    let args = Args::parse();
    let cfg = IngestConfig::from_env()?;

    let leagues = if args.leagues.is_empty() {
        cfg.leagues.clone()
    } else {
        args.leagues.clone()
    };
    let season = args
        .season
        .unwrap_or_else(|| Season::current(Utc::now().date_naive()));
    let toggles = CategoryToggles {
        matches: !args.no_matches,
        team_stats: !args.no_stats,
        player_stats: !args.no_stats,
        standings: !args.no_standings,
    };

    let store = PgStorage::connect(
        &env_util::db_url()?,
        &cfg.schema,
        cfg.db_min_conns,
        cfg.db_max_conns,
    )
    .await?;
    let source = HttpFeedClient::from_env()?;
    let orchestrator = Orchestrator::new(&store, &source, cfg.pacing);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            warn!("daily update interrupted");
            anyhow::bail!("interrupted");
        }
        _totals = orchestrator.run_daily(&leagues, season, toggles) => {
            info!("daily update finished");
        }
    }
    Ok(())
}
