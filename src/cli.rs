//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use boxscore_core::RateLimitPolicy;
use clap::{Args as ClapArgs, Parser, Subcommand};

/// Fetch box-score pages politely and turn their tables into CSV.
///
/// Fetch settings come from `BOXSCORE_*` environment variables (a `.env`
/// file is read if present); the flags below override them.
#[derive(Parser, Debug)]
#[command(name = "boxscore")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Minimum seconds between network requests (0 to disable)
    #[arg(long, global = true, value_name = "SECS")]
    pub min_interval: Option<f64>,

    /// Attempts per page, including the first (1-20)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: Option<u32>,

    /// What to do on HTTP 429: `skip` defers the game, `backoff` waits and retries
    #[arg(long, global = true)]
    pub policy: Option<RateLimitPolicy>,

    /// Bypass the response cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch team totals and write totals_tidy.csv and totals_wide.csv
    Totals(ScrapeArgs),
    /// Fetch linescores and write linescore_tidy.csv and linescore_wide.csv
    Linescore(ScrapeArgs),
    /// Join the index with linescore and totals wide tables
    Features(FeaturesArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ScrapeArgs {
    /// Game index CSV
    #[arg(long)]
    pub index: PathBuf,

    /// Output directory
    #[arg(long)]
    pub out: PathBuf,

    /// Stop after this many games produce rows
    #[arg(long)]
    pub limit: Option<usize>,

    /// Ignore rows from a previous run instead of resuming
    #[arg(long)]
    pub fresh: bool,
}

#[derive(ClapArgs, Debug)]
pub struct FeaturesArgs {
    /// Game index CSV
    #[arg(long)]
    pub index: PathBuf,

    /// Linescore wide CSV
    #[arg(long)]
    pub linescore: PathBuf,

    /// Totals wide CSV
    #[arg(long)]
    pub totals: PathBuf,

    /// Output CSV
    #[arg(long)]
    pub out: PathBuf,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn totals_args(extra: &[&str]) -> Args {
        let mut argv = vec!["boxscore"];
        argv.extend_from_slice(extra);
        argv.extend_from_slice(&["totals", "--index", "idx.csv", "--out", "out"]);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_totals_parses_paths() {
        let args = totals_args(&[]);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        match args.command {
            Command::Totals(scrape) => {
                assert_eq!(scrape.index, PathBuf::from("idx.csv"));
                assert_eq!(scrape.out, PathBuf::from("out"));
                assert_eq!(scrape.limit, None);
                assert!(!scrape.fresh);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        assert_eq!(totals_args(&["-v"]).verbose, 1);
        assert_eq!(totals_args(&["-vv"]).verbose, 2);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "boxscore", "linescore", "--index", "i.csv", "--out", "o", "--limit", "3", "-q",
            "--policy", "skip", "--no-cache",
        ])
        .unwrap();
        assert!(args.quiet);
        assert!(args.no_cache);
        assert_eq!(args.policy, Some(RateLimitPolicy::Skip));
        assert!(matches!(args.command, Command::Linescore(ScrapeArgs { limit: Some(3), .. })));
    }

    #[test]
    fn test_cli_fetch_overrides() {
        let args = totals_args(&["--min-interval", "0.5", "--max-attempts", "3"]);
        assert_eq!(args.min_interval, Some(0.5));
        assert_eq!(args.max_attempts, Some(3));
    }

    #[test]
    fn test_cli_max_attempts_zero_rejected() {
        let result = Args::try_parse_from([
            "boxscore", "--max-attempts", "0", "totals", "--index", "i", "--out", "o",
        ]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_invalid_policy_rejected() {
        let result = Args::try_parse_from([
            "boxscore", "--policy", "never", "totals", "--index", "i", "--out", "o",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_features_requires_all_paths() {
        let result = Args::try_parse_from(["boxscore", "features", "--index", "i.csv"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_subcommand_required() {
        assert!(Args::try_parse_from(["boxscore"]).is_err());
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["boxscore", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
