//! CLI entry point for the boxscore tool.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use boxscore_core::fetch::{Fetcher, HttpCache};
use boxscore_core::index::{LINESCORE_COLUMNS, TOTALS_COLUMNS};
use boxscore_core::normalize::normalize_rows;
use boxscore_core::output::{
    ensure_dir, read_linescore_tidy, read_tidy, read_wide, write_features, write_linescore_tidy,
    write_missing, write_tidy, write_wide,
};
use boxscore_core::reshape::dedupe_linescores;
use boxscore_core::{
    BatchOptions, BatchRunner, Database, FetchConfig, build_features, linescores_to_wide,
    read_index, to_wide,
};
use clap::Parser;
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command, FeaturesArgs, ScrapeArgs};

const TOTALS_TIDY: &str = "totals_tidy.csv";
const TOTALS_WIDE: &str = "totals_wide.csv";
const LINESCORE_TIDY: &str = "linescore_tidy.csv";
const LINESCORE_WIDE: &str = "linescore_wide.csv";
const TOTALS_MISSING: &str = "missing_totals.csv";
const LINESCORE_MISSING: &str = "missing_linescore.csv";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }

    let config = fetch_config(&args)?;

    match args.command {
        Command::Totals(scrape) => run_totals(&config, &scrape).await,
        Command::Linescore(scrape) => run_linescore(&config, &scrape).await,
        Command::Features(features) => run_features(&features),
    }
}

/// Environment configuration with CLI overrides applied.
fn fetch_config(args: &Args) -> Result<FetchConfig> {
    let mut config = FetchConfig::from_env().context("invalid fetch configuration")?;

    if let Some(secs) = args.min_interval {
        config.min_interval =
            Duration::try_from_secs_f64(secs).context("--min-interval must be non-negative")?;
    }
    if let Some(attempts) = args.max_attempts {
        config.max_attempts = attempts;
    }
    if let Some(policy) = args.policy {
        config.rate_limit_policy = policy;
    }
    if args.no_cache {
        config.cache_ttl = Duration::ZERO;
    }

    debug!(?config, "effective fetch configuration");
    Ok(config)
}

async fn build_fetcher(config: &FetchConfig) -> Result<Arc<Fetcher>> {
    let cache = if config.cache_enabled() {
        let db = Database::new(&config.cache_path)
            .await
            .with_context(|| format!("failed to open cache {}", config.cache_path.display()))?;
        let cache = HttpCache::new(db, config.cache_ttl);
        if let Err(e) = cache.purge_expired().await {
            warn!(error = %e, "cache purge failed, continuing");
        }
        Some(cache)
    } else {
        debug!("response cache disabled");
        None
    };

    Ok(Arc::new(Fetcher::new(config, cache)?))
}

async fn run_totals(config: &FetchConfig, args: &ScrapeArgs) -> Result<()> {
    let games = read_index(&args.index, TOTALS_COLUMNS)?;
    ensure_dir(&args.out)?;

    let tidy_path = args.out.join(TOTALS_TIDY);
    let mut raw_rows = if args.fresh || !tidy_path.exists() {
        Vec::new()
    } else {
        read_tidy(&tidy_path)?
            .iter()
            .map(boxscore_core::TidyRecord::to_raw)
            .collect()
    };
    let done: HashSet<String> = raw_rows.iter().map(|r| r.game_id.to_lowercase()).collect();
    info!(games = games.len(), resumed = done.len(), "starting totals run");

    let runner = BatchRunner::new(build_fetcher(config).await?, &config.base_url)
        .with_options(BatchOptions {
            limit: args.limit,
            done,
        });
    let report = runner.run_totals(&games).await;
    write_missing(&args.out.join(TOTALS_MISSING), &report.missing())?;
    raw_rows.extend(report.rows);

    let normalized = normalize_rows(&raw_rows);
    let tidy: Vec<_> = normalized.iter().map(|row| row.to_tidy()).collect();
    write_tidy(&tidy_path, &tidy)?;
    write_wide(&args.out.join(TOTALS_WIDE), &to_wide(&normalized))?;

    info!(rows = tidy.len(), out = %args.out.display(), "wrote totals");
    Ok(())
}

async fn run_linescore(config: &FetchConfig, args: &ScrapeArgs) -> Result<()> {
    let games = read_index(&args.index, LINESCORE_COLUMNS)?;
    ensure_dir(&args.out)?;

    let tidy_path = args.out.join(LINESCORE_TIDY);
    let mut records = if args.fresh || !tidy_path.exists() {
        Vec::new()
    } else {
        read_linescore_tidy(&tidy_path)?
    };
    let done: HashSet<String> = records.iter().map(|r| r.game_id.to_lowercase()).collect();
    info!(games = games.len(), resumed = done.len(), "starting linescore run");

    let runner = BatchRunner::new(build_fetcher(config).await?, &config.base_url)
        .with_options(BatchOptions {
            limit: args.limit,
            done,
        });
    let report = runner.run_linescores(&games).await;
    write_missing(&args.out.join(LINESCORE_MISSING), &report.missing())?;
    records.extend(report.rows.iter().flat_map(|ls| ls.to_records()));

    let tidy = dedupe_linescores(&records);
    write_linescore_tidy(&tidy_path, &tidy)?;
    write_wide(&args.out.join(LINESCORE_WIDE), &linescores_to_wide(&tidy))?;

    info!(rows = tidy.len(), out = %args.out.display(), "wrote linescores");
    Ok(())
}

fn run_features(args: &FeaturesArgs) -> Result<()> {
    let index = read_index(&args.index, LINESCORE_COLUMNS)?;
    let linescore = read_wide(&args.linescore)?;
    let totals = read_wide(&args.totals)?;

    let features = build_features(&index, &linescore, &totals);
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    write_features(&args.out, &features)?;

    info!(rows = features.len(), out = %args.out.display(), "wrote features table");
    Ok(())
}
