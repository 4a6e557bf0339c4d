//! CSV sinks for tidy, wide and features tables, and readers for the
//! tables a later run resumes from.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::batch::GameOutcome;
use crate::features::{FeatureRecord, META_COLUMNS};
use crate::normalize::TidyRecord;
use crate::reshape::{LinescoreRecord, WideRecord, column_union};

/// Tidy totals header, in column order.
pub const TIDY_COLUMNS: &[&str] = &[
    "game_id",
    "stat",
    "stat_norm",
    "away_val_raw",
    "away_val_int",
    "away_made",
    "away_att",
    "away_seconds",
    "home_val_raw",
    "home_val_int",
    "home_made",
    "home_att",
    "home_seconds",
    "away_team",
    "home_team",
    "away_header",
    "home_header",
];

/// Tidy linescore header, in column order.
pub const LINESCORE_COLUMNS: &[&str] =
    &["game_id", "side", "team", "q1", "q2", "q3", "q4", "ot", "total"];

/// Errors writing or reading output tables.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error for {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Creates `dir` and its parents if missing.
///
/// # Errors
///
/// Returns [`OutputError::CreateDir`] if the directory cannot be created.
pub fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes tidy totals rows.
///
/// # Errors
///
/// Returns an [`OutputError`] if the file cannot be written.
#[instrument(skip(records), fields(path = %path.display(), rows = records.len()))]
pub fn write_tidy(path: &Path, records: &[TidyRecord]) -> Result<(), OutputError> {
    write_serialized(path, TIDY_COLUMNS, records)
}

/// Reads tidy totals rows written by [`write_tidy`].
///
/// # Errors
///
/// Returns an [`OutputError`] if the file cannot be read or parsed.
pub fn read_tidy(path: &Path) -> Result<Vec<TidyRecord>, OutputError> {
    read_serialized(path)
}

/// Writes tidy linescore rows.
///
/// # Errors
///
/// Returns an [`OutputError`] if the file cannot be written.
#[instrument(skip(records), fields(path = %path.display(), rows = records.len()))]
pub fn write_linescore_tidy(path: &Path, records: &[LinescoreRecord]) -> Result<(), OutputError> {
    write_serialized(path, LINESCORE_COLUMNS, records)
}

/// Reads tidy linescore rows written by [`write_linescore_tidy`].
///
/// # Errors
///
/// Returns an [`OutputError`] if the file cannot be read or parsed.
pub fn read_linescore_tidy(path: &Path) -> Result<Vec<LinescoreRecord>, OutputError> {
    read_serialized(path)
}

/// Header of the missing-games list.
pub const MISSING_COLUMNS: &[&str] = &["game_id", "reason"];

/// Writes the games a batch produced no rows for, one per line with the
/// outcome as the reason, so a later run or an audit can pick them up.
///
/// # Errors
///
/// Returns an [`OutputError`] if the file cannot be written.
#[instrument(skip(missing), fields(path = %path.display(), rows = missing.len()))]
pub fn write_missing(path: &Path, missing: &[(&str, &GameOutcome)]) -> Result<(), OutputError> {
    let rows: Vec<(&str, String)> = missing
        .iter()
        .map(|(game_id, outcome)| (*game_id, outcome.to_string()))
        .collect();
    write_serialized(path, MISSING_COLUMNS, &rows)
}

/// Writes wide records: `game_id, away_team, home_team`, then every
/// column in the union set, sorted. Empty values become empty cells.
///
/// # Errors
///
/// Returns an [`OutputError`] if the file cannot be written.
#[instrument(skip(records), fields(path = %path.display(), rows = records.len()))]
pub fn write_wide(path: &Path, records: &[WideRecord]) -> Result<(), OutputError> {
    let columns = column_union(records);
    let mut writer = csv::Writer::from_path(path).map_err(|e| OutputError::csv(path, e))?;

    let header = ["game_id", "away_team", "home_team"]
        .into_iter()
        .chain(columns.iter().map(String::as_str));
    writer
        .write_record(header)
        .map_err(|e| OutputError::csv(path, e))?;

    for record in records {
        let row = [
            record.game_id.clone(),
            record.away_team.clone(),
            record.home_team.clone(),
        ]
        .into_iter()
        .chain(columns.iter().map(|column| cell(record.get(column))));
        writer
            .write_record(row)
            .map_err(|e| OutputError::csv(path, e))?;
    }

    writer.flush().map_err(|e| OutputError::io(path, e))?;
    debug!(columns = columns.len(), "wrote wide table");
    Ok(())
}

/// Reads a wide table written by [`write_wide`]. Non-numeric cells in
/// stat columns read as empty.
///
/// # Errors
///
/// Returns an [`OutputError`] if the file cannot be read or parsed.
pub fn read_wide(path: &Path) -> Result<Vec<WideRecord>, OutputError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| OutputError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| OutputError::csv(path, e))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| OutputError::csv(path, e))?;
        let mut record = WideRecord::default();
        for (name, value) in headers.iter().zip(row.iter()) {
            match name {
                "game_id" => record.game_id = value.to_string(),
                "away_team" => record.away_team = value.to_string(),
                "home_team" => record.home_team = value.to_string(),
                column => {
                    record
                        .columns
                        .insert(column.to_string(), value.trim().parse().ok());
                }
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Writes the features table: `game_id`, metadata columns, every numeric
/// column, then `point_diff, winner, loser`.
///
/// # Errors
///
/// Returns an [`OutputError`] if the file cannot be written.
#[instrument(skip(records), fields(path = %path.display(), rows = records.len()))]
pub fn write_features(path: &Path, records: &[FeatureRecord]) -> Result<(), OutputError> {
    let meta: Vec<&str> = META_COLUMNS
        .iter()
        .copied()
        .filter(|column| records.iter().any(|r| r.metadata.contains_key(*column)))
        .collect();
    let columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.columns.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path).map_err(|e| OutputError::csv(path, e))?;

    let header = std::iter::once("game_id")
        .chain(meta.iter().copied())
        .chain(columns.iter().copied())
        .chain(["point_diff", "winner", "loser"]);
    writer
        .write_record(header)
        .map_err(|e| OutputError::csv(path, e))?;

    for record in records {
        let row = std::iter::once(record.game_id.clone())
            .chain(
                meta.iter()
                    .map(|column| record.metadata.get(*column).cloned().unwrap_or_default()),
            )
            .chain(
                columns
                    .iter()
                    .map(|column| cell(record.columns.get(*column).copied().flatten())),
            )
            .chain([
                cell(record.point_diff),
                record.winner.clone().unwrap_or_default(),
                record.loser.clone().unwrap_or_default(),
            ]);
        writer
            .write_record(row)
            .map_err(|e| OutputError::csv(path, e))?;
    }

    writer.flush().map_err(|e| OutputError::io(path, e))?;
    Ok(())
}

fn cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes an explicit header so empty tables still carry their columns.
fn write_serialized<T: Serialize>(
    path: &Path,
    header: &[&str],
    records: &[T],
) -> Result<(), OutputError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| OutputError::csv(path, e))?;

    writer
        .write_record(header)
        .map_err(|e| OutputError::csv(path, e))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| OutputError::csv(path, e))?;
    }
    writer.flush().map_err(|e| OutputError::io(path, e))
}

fn read_serialized<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OutputError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| OutputError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|e| OutputError::csv(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::TempDir;

    use super::*;
    use crate::normalize::normalize;
    use crate::table::{RawStatRow, Side};

    fn tidy() -> TidyRecord {
        normalize(&RawStatRow {
            game_id: "g1".into(),
            stat: "Third Down Conv.".into(),
            away_value: "5-12".into(),
            home_value: "bad".into(),
            away_team: "A".into(),
            home_team: "H".into(),
            away_header: "AAA".into(),
            home_header: "HHH".into(),
        })
        .to_tidy()
    }

    #[test]
    fn test_tidy_written_with_header_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("totals_tidy.csv");
        write_tidy(&path, &[tidy()]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&TIDY_COLUMNS.join(",")));
        assert!(text.contains("g1,Third Down Conv.,third_down_conv,5-12,,5,12,,bad,,,,,A,H,AAA,HHH"));

        assert_eq!(read_tidy(&path).unwrap(), vec![tidy()]);
    }

    #[test]
    fn test_empty_tidy_still_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        write_tidy(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), TIDY_COLUMNS.join(","));
        assert!(read_tidy(&path).unwrap().is_empty());
    }

    #[test]
    fn test_linescore_tidy_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("linescore_tidy.csv");
        let record = LinescoreRecord {
            game_id: "g1".into(),
            side: Side::Home,
            team: "Philadelphia Eagles".into(),
            q1: Some(0),
            q2: Some(7),
            q3: None,
            q4: Some(11),
            ot: None,
            total: Some(18),
        };
        write_linescore_tidy(&path, std::slice::from_ref(&record)).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("g1,home,Philadelphia Eagles,0,7,,11,,18"));
        assert_eq!(read_linescore_tidy(&path).unwrap(), vec![record]);
    }

    #[test]
    fn test_wide_round_trip_with_empty_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("totals_wide.csv");
        let record = WideRecord {
            game_id: "g1".into(),
            away_team: "A".into(),
            home_team: "H".into(),
            columns: BTreeMap::from([
                ("home_total_yards".to_string(), Some(410)),
                ("away_total_yards".to_string(), None),
            ]),
        };
        write_wide(&path, std::slice::from_ref(&record)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("game_id,away_team,home_team,away_total_yards,home_total_yards")
        );
        assert_eq!(lines.next(), Some("g1,A,H,,410"));

        assert_eq!(read_wide(&path).unwrap(), vec![record]);
    }

    #[test]
    fn test_features_columns_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("features.csv");
        let record = FeatureRecord {
            game_id: "g1".into(),
            metadata: BTreeMap::from([
                ("away".to_string(), "A".to_string()),
                ("season".to_string(), "2018".to_string()),
                ("home".to_string(), "H".to_string()),
            ]),
            columns: BTreeMap::from([
                ("home_total".to_string(), Some(18)),
                ("away_total".to_string(), Some(12)),
            ]),
            point_diff: Some(6),
            winner: Some("H".into()),
            loser: Some("A".into()),
        };
        write_features(&path, &[record]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("game_id,season,home,away,away_total,home_total,point_diff,winner,loser")
        );
        assert_eq!(lines.next(), Some("g1,2018,H,A,12,18,6,H,A"));
    }

    #[test]
    fn test_missing_list_carries_reasons() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing_linescore.csv");
        let failed = GameOutcome::Failed("HTTP 404 fetching x".to_string());
        write_missing(
            &path,
            &[("g2", &GameOutcome::Empty), ("g3", &GameOutcome::Deferred), ("g4", &failed)],
        )
        .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "game_id,reason",
                "g2,empty",
                "g3,deferred",
                "g4,failed: HTTP 404 fetching x",
            ]
        );
    }

    #[test]
    fn test_ensure_dir_creates_parents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
