//! Per-game modeling table.
//!
//! Joins the linescore and totals wide tables onto the game index and
//! derives the final margin and the winning and losing teams.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::index::GameEntry;
use crate::reshape::WideRecord;

/// Index columns carried into the features table, in output order.
pub const META_COLUMNS: &[&str] = &["season", "date", "week", "game_type", "home", "away"];

/// One game of the modeling table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureRecord {
    /// Lowercased game id.
    pub game_id: String,
    /// Index metadata restricted to [`META_COLUMNS`].
    pub metadata: BTreeMap<String, String>,
    /// Numeric columns from the linescore then the totals wide tables.
    pub columns: BTreeMap<String, Option<i64>>,
    /// `home_total - away_total` when both are known.
    pub point_diff: Option<i64>,
    pub winner: Option<String>,
    pub loser: Option<String>,
}

/// Builds the modeling table.
///
/// Every index game appears once (first row wins), in index order. Wide
/// records are matched on lowercased game id; games without a match keep
/// empty columns.
#[must_use]
pub fn build_features(
    index: &[GameEntry],
    linescore: &[WideRecord],
    totals: &[WideRecord],
) -> Vec<FeatureRecord> {
    let linescore_by_game = by_game(linescore);
    let totals_by_game = by_game(totals);
    let mut seen = HashSet::new();

    let records: Vec<FeatureRecord> = index
        .iter()
        .filter(|entry| seen.insert(entry.game_id.to_lowercase()))
        .map(|entry| {
            let game_id = entry.game_id.to_lowercase();
            let ls = linescore_by_game.get(game_id.as_str()).copied();
            let tot = totals_by_game.get(game_id.as_str()).copied();

            let columns = merge_columns(&game_id, [ls, tot].into_iter().flatten());

            let home_name = team_name(&entry.home, ls.map(|r| r.home_team.as_str()));
            let away_name = team_name(&entry.away, ls.map(|r| r.away_team.as_str()));

            let home_total = columns.get("home_total").copied().flatten();
            let away_total = columns.get("away_total").copied().flatten();
            let (point_diff, winner, loser) = outcome(home_total, away_total, home_name, away_name);

            FeatureRecord {
                metadata: metadata(entry),
                game_id,
                columns,
                point_diff,
                winner,
                loser,
            }
        })
        .collect();

    debug!(games = records.len(), "built features table");
    records
}

/// Unions the numeric columns of `records`; on a name collision the
/// earlier record keeps its value.
fn merge_columns<'a>(
    game_id: &str,
    records: impl IntoIterator<Item = &'a WideRecord>,
) -> BTreeMap<String, Option<i64>> {
    let mut columns = BTreeMap::new();
    for record in records {
        for (name, value) in &record.columns {
            match columns.entry(name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(*value);
                }
                Entry::Occupied(kept) => debug!(
                    game_id,
                    column = %name,
                    kept = ?kept.get(),
                    dropped = ?value,
                    "column present in both wide tables, keeping linescore value"
                ),
            }
        }
    }
    columns
}

fn by_game(records: &[WideRecord]) -> HashMap<String, &WideRecord> {
    let mut map = HashMap::new();
    for record in records {
        map.entry(record.game_id.to_lowercase()).or_insert(record);
    }
    map
}

fn metadata(entry: &GameEntry) -> BTreeMap<String, String> {
    META_COLUMNS
        .iter()
        .filter_map(|&column| {
            let value = match column {
                "home" => Some(entry.home.clone()),
                "away" => Some(entry.away.clone()),
                other => entry.metadata.get(other).cloned(),
            };
            value.map(|v| (column.to_string(), v))
        })
        .collect()
}

fn team_name(index_name: &str, linescore_name: Option<&str>) -> Option<String> {
    [Some(index_name), linescore_name]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

fn outcome(
    home_total: Option<i64>,
    away_total: Option<i64>,
    home: Option<String>,
    away: Option<String>,
) -> (Option<i64>, Option<String>, Option<String>) {
    let (Some(home_total), Some(away_total)) = (home_total, away_total) else {
        return (None, None, None);
    };

    let diff = home_total - away_total;
    match diff.signum() {
        1 => (Some(diff), home, away),
        -1 => (Some(diff), away, home),
        _ => (Some(diff), None, None),
    }
}
