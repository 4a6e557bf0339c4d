//! Batch runner: one sequential fetch stream over a list of games.
//!
//! A failure for one game never aborts the batch. Each game gets a
//! [`GameOutcome`], and the [`BatchReport`] carries the per-outcome counts
//! along with the rows collected from completed games.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::fetch::{FetchError, Fetcher};
use crate::index::GameEntry;
use crate::table::{
    LineScore, RawStatRow, TableIdentity, extract_linescore, extract_stat_rows, locate,
};

/// What happened to one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// Rows were extracted.
    Completed,
    /// The page had no matching table, or the table had no usable rows.
    Empty,
    /// Skipped because an earlier run already produced it.
    AlreadyDone,
    /// Rate limited under the skip policy; retry in a later run.
    Deferred,
    /// The fetch failed for good.
    Failed(String),
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Empty => f.write_str("empty"),
            Self::AlreadyDone => f.write_str("already done"),
            Self::Deferred => f.write_str("deferred"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Per-game outcomes and collected rows of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<T> {
    /// `(game_id, outcome)` in processing order.
    pub outcomes: Vec<(String, GameOutcome)>,
    /// Rows from completed games, in processing order.
    pub rows: Vec<T>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    fn count(&self, matches: impl Fn(&GameOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| matches(o)).count()
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(|o| *o == GameOutcome::Completed)
    }

    #[must_use]
    pub fn empty(&self) -> usize {
        self.count(|o| *o == GameOutcome::Empty)
    }

    #[must_use]
    pub fn already_done(&self) -> usize {
        self.count(|o| *o == GameOutcome::AlreadyDone)
    }

    #[must_use]
    pub fn deferred(&self) -> usize {
        self.count(|o| *o == GameOutcome::Deferred)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, GameOutcome::Failed(_)))
    }

    /// Games looked at, including skipped ones.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Games that produced no rows in this run: empty, deferred and
    /// failed, with their outcome.
    #[must_use]
    pub fn missing(&self) -> Vec<(&str, &GameOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !matches!(o, GameOutcome::Completed | GameOutcome::AlreadyDone))
            .map(|(id, o)| (id.as_str(), o))
            .collect()
    }

    /// Ids of games to retry later: deferred and failed.
    #[must_use]
    pub fn retry_later(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, GameOutcome::Deferred | GameOutcome::Failed(_)))
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Options shared by both batch paths.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Stop after this many completed games.
    pub limit: Option<usize>,
    /// Game ids finished by an earlier run, compared lowercase.
    pub done: HashSet<String>,
}

/// Runs the totals or linescore path over a list of games.
#[derive(Debug)]
pub struct BatchRunner {
    fetcher: Arc<Fetcher>,
    base_url: String,
    options: BatchOptions,
}

impl BatchRunner {
    /// Creates a runner fetching pages under `base_url`.
    #[must_use]
    pub fn new(fetcher: Arc<Fetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options: BatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Box-score page URL for a game.
    #[must_use]
    pub fn boxscore_url(&self, game_id: &str) -> String {
        format!("{}/boxscores/{game_id}.htm", self.base_url)
    }

    /// Fetches each game's page and extracts its team totals rows.
    ///
    /// Team names come from the index entry.
    #[instrument(skip_all, fields(games = games.len()))]
    pub async fn run_totals(&self, games: &[GameEntry]) -> BatchReport<RawStatRow> {
        let identity = TableIdentity::team_stats();
        let report = self
            .run(games, |entry| entry.game_id.clone(), |entry, html| {
                let rows = locate(html, &identity)
                    .map(|grid| extract_stat_rows(&grid, &entry.game_id, &entry.away, &entry.home))
                    .unwrap_or_default();
                (!rows.is_empty()).then_some(rows)
            })
            .await;
        log_report("totals", &report);
        report
    }

    /// Fetches each game's page and extracts its linescore. Game ids are
    /// lowercased.
    #[instrument(skip_all, fields(games = games.len()))]
    pub async fn run_linescores(&self, games: &[GameEntry]) -> BatchReport<LineScore> {
        let identity = TableIdentity::linescore();
        let report = self
            .run(games, |entry| entry.game_id.to_lowercase(), |entry, html| {
                locate(html, &identity)
                    .and_then(|grid| extract_linescore(&grid, &entry.game_id))
                    .map(|ls| vec![ls])
            })
            .await;
        log_report("linescore", &report);
        report
    }

    async fn run<T, I, E>(&self, games: &[GameEntry], game_id_of: I, extract: E) -> BatchReport<T>
    where
        I: Fn(&GameEntry) -> String,
        E: Fn(&GameEntry, &str) -> Option<Vec<T>>,
    {
        let mut report = BatchReport::default();
        let mut completed = 0usize;

        for entry in games {
            if self.options.limit.is_some_and(|limit| completed >= limit) {
                debug!(completed, "limit reached");
                break;
            }

            let game_id = game_id_of(entry);
            if self.options.done.contains(&game_id.to_lowercase()) {
                report.outcomes.push((game_id, GameOutcome::AlreadyDone));
                continue;
            }

            let outcome = match self.fetcher.fetch(&self.boxscore_url(&game_id)).await {
                Ok(html) => match extract(entry, &html) {
                    Some(rows) => {
                        report.rows.extend(rows);
                        completed += 1;
                        if completed % 25 == 0 {
                            info!(completed, "progress");
                        }
                        GameOutcome::Completed
                    }
                    None => {
                        debug!(%game_id, "no matching table");
                        GameOutcome::Empty
                    }
                },
                Err(FetchError::RateLimited { .. }) => {
                    warn!(%game_id, "rate limited, deferring to a later run");
                    GameOutcome::Deferred
                }
                Err(e) => {
                    warn!(%game_id, error = %e, "fetch failed");
                    GameOutcome::Failed(e.to_string())
                }
            };

            report.outcomes.push((game_id, outcome));
        }

        report
    }
}

fn log_report<T>(path: &str, report: &BatchReport<T>) {
    info!(
        path,
        completed = report.completed(),
        empty = report.empty(),
        already_done = report.already_done(),
        deferred = report.deferred(),
        failed = report.failed(),
        total = report.total(),
        "batch finished"
    );
    if !report.retry_later().is_empty() {
        info!(
            count = report.retry_later().len(),
            "some games were deferred or failed; re-run to resume"
        );
    }
}
