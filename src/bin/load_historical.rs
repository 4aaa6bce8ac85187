use anyhow::Result;
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
    name = "load_historical",
    about = "Backfill matches, statistics and standings across a season range"
)]
struct Args {
    /// League code(s) to process (default: configured league list)
    #[arg(long = "league")]
    leagues: Vec<String>,
    /// Starting season (default: configured range start)
    #[arg(long)]
    start_season: Option<Season>,
    /// Ending season, inclusive (default: configured range end)
    #[arg(long)]
    end_season: Option<Season>,
    /// Bypass the feed cache
    #[arg(long, default_value_t = false)]
    force_refresh: bool,
    /// Skip loading match data
    #[arg(long, default_value_t = false)]
    skip_matches: bool,
    /// Skip loading team statistics
    #[arg(long, default_value_t = false)]
    skip_team_stats: bool,
    /// Skip loading player statistics
    #[arg(long, default_value_t = false)]
    skip_player_stats: bool,
    /// Skip loading league standings
    #[arg(long, default_value_t = false)]
    skip_standings: bool,
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
    let start = args.start_season.unwrap_or(cfg.start_season);
    let end = args.end_season.unwrap_or(cfg.end_season);
    if end < start {
        anyhow::bail!("--end-season precedes --start-season");
    }
    let toggles = CategoryToggles {
        matches: !args.skip_matches,
        team_stats: !args.skip_team_stats,
        player_stats: !args.skip_player_stats,
        standings: !args.skip_standings,
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
            warn!("historical load interrupted");
            anyhow::bail!("interrupted");
        }
        _totals = orchestrator.run_historical(&leagues, start, end, args.force_refresh, toggles) => {
            info!("historical load finished");
        }
    }
    Ok(())
}
