//! Game index input.
//!
//! The index is a CSV with a header row listing the games to process. Only
//! a few columns are required; everything else is kept as metadata for the
//! features table.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use thiserror::Error;
use tracing::{debug, instrument};

/// Columns the totals path cannot run without.
pub const TOTALS_COLUMNS: &[&str] = &["game_id", "away", "home"];

/// Columns the linescore path cannot run without.
pub const LINESCORE_COLUMNS: &[&str] = &["game_id"];

/// Errors reading the game index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to open index {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed index CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("index missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },
}

/// One game listed in the index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameEntry {
    pub game_id: String,
    /// Away team name; empty when the column is absent.
    pub away: String,
    /// Home team name; empty when the column is absent.
    pub home: String,
    /// Every other column by header name.
    pub metadata: BTreeMap<String, String>,
}

/// Reads the index at `path`, requiring `required` columns.
///
/// # Errors
///
/// Returns [`IndexError::MissingColumns`] naming every required column the
/// header lacks, or an I/O or CSV error.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_index(path: &Path, required: &[&str]) -> Result<Vec<GameEntry>, IndexError> {
    let file = File::open(path).map_err(|source| IndexError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_index_from(file, required)
}

/// Reads an index from any reader. See [`read_index`].
///
/// # Errors
///
/// See [`read_index`].
pub fn read_index_from<R: Read>(
    reader: R,
    required: &[&str],
) -> Result<Vec<GameEntry>, IndexError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header_name).collect();
    let header_map: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_str(), index))
        .collect();

    let missing: Vec<String> = required
        .iter()
        .filter(|column| !header_map.contains_key(**column))
        .map(|column| (*column).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IndexError::MissingColumns { columns: missing });
    }

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let entry = entry_from(&record, &headers, &header_map);
        if entry.game_id.is_empty() {
            debug!("skipping index row without game_id");
            continue;
        }
        entries.push(entry);
    }

    debug!(games = entries.len(), "read game index");
    Ok(entries)
}

fn entry_from(
    record: &StringRecord,
    headers: &[String],
    header_map: &HashMap<&str, usize>,
) -> GameEntry {
    let get = |name: &str| {
        header_map
            .get(name)
            .and_then(|index| record.get(*index))
            .unwrap_or_default()
            .to_string()
    };

    let metadata = headers
        .iter()
        .zip(record.iter())
        .filter(|(name, _)| !matches!(name.as_str(), "game_id" | "away" | "home"))
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect();

    GameEntry {
        game_id: get("game_id"),
        away: get("away"),
        home: get("home"),
        metadata,
    }
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}
