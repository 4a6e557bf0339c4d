//! Reshaper: long-format stat rows to one wide record per game, and back.
//!
//! Rows are grouped by value shape and each group is pivoted on its own,
//! keeping the first value when a `(game, stat)` pair repeats. The groups
//! are then left-joined onto the distinct set of observed games, so a game
//! missing one shape's stats still appears with empty cells there.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::normalize::{NormalizedStatRow, StatKey, TypedValue, ValueShape};
use crate::table::{LineScore, Periods, RawStatRow, Side};

/// One row per game: `{side}_{stat}[_made|_att|_seconds]` columns.
///
/// Every record produced together carries the same column set; absent
/// stats are `None`, never missing keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WideRecord {
    pub game_id: String,
    pub away_team: String,
    pub home_team: String,
    pub columns: BTreeMap<String, Option<i64>>,
}

impl WideRecord {
    fn new(game_id: &str, away_team: &str, home_team: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            away_team: away_team.to_string(),
            home_team: home_team.to_string(),
            columns: BTreeMap::new(),
        }
    }

    /// Returns the value in `column`, `None` when empty or absent.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<i64> {
        self.columns.get(column).copied().flatten()
    }
}

/// Returns the union of column names across `records`, sorted.
#[must_use]
pub fn column_union(records: &[WideRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|record| record.columns.keys().cloned())
        .collect()
}

/// Pivots normalized rows into one record per game.
#[must_use]
pub fn to_wide(rows: &[NormalizedStatRow]) -> Vec<WideRecord> {
    let mut base: Vec<WideRecord> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let raw = &row.raw;
        positions.entry(raw.game_id.as_str()).or_insert_with(|| {
            base.push(WideRecord::new(&raw.game_id, &raw.away_team, &raw.home_team));
            base.len() - 1
        });
    }

    let mut columns = BTreeSet::new();
    for shape in [ValueShape::Integer, ValueShape::Ratio, ValueShape::Duration] {
        let group: Vec<&NormalizedStatRow> = rows.iter().filter(|r| r.shape() == shape).collect();
        if group.is_empty() {
            continue;
        }

        let pivoted = pivot_group(&group);
        trace!(?shape, games = pivoted.len(), "pivoted shape group");

        for (game_id, cells) in pivoted {
            let Some(&index) = positions.get(game_id) else {
                continue;
            };
            for (name, value) in cells {
                columns.insert(name.clone());
                base[index].columns.insert(name, value);
            }
        }
    }

    fill_columns(&mut base, &columns);
    debug!(games = base.len(), columns = columns.len(), "built wide table");
    base
}

/// Pivots one shape group. The first row for a `(game, stat)` pair wins.
fn pivot_group<'a>(
    group: &[&'a NormalizedStatRow],
) -> BTreeMap<&'a str, Vec<(String, Option<i64>)>> {
    let mut seen: HashSet<(&str, &StatKey)> = HashSet::new();
    let mut pivoted: BTreeMap<&str, Vec<(String, Option<i64>)>> = BTreeMap::new();

    for &row in group {
        let game_id = row.raw.game_id.as_str();
        if !seen.insert((game_id, &row.stat_norm)) {
            trace!(game_id, stat = %row.stat_norm, "dropping duplicate stat row");
            continue;
        }
        let cells = pivoted.entry(game_id).or_default();
        for side in Side::BOTH {
            cells.extend(cells_for(side, &row.stat_norm, row.value(side)));
        }
    }

    pivoted
}

/// Wide cells for one side of one stat.
fn cells_for(side: Side, key: &StatKey, value: &TypedValue) -> Vec<(String, Option<i64>)> {
    let prefix = format!("{side}_{key}");
    match *value {
        TypedValue::Integer(v) => vec![(prefix, v)],
        TypedValue::Ratio { made, att } => {
            vec![(format!("{prefix}_made"), made), (format!("{prefix}_att"), att)]
        }
        TypedValue::Duration { seconds } => vec![(format!("{prefix}_seconds"), seconds)],
    }
}

fn fill_columns(records: &mut [WideRecord], columns: &BTreeSet<String>) {
    for record in records {
        for column in columns {
            record.columns.entry(column.clone()).or_insert(None);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnPart {
    Value,
    Made,
    Att,
    Seconds,
}

/// Splits a wide column name into side, stat key and part.
///
/// Known keys are matched whole first. A `_made`/`_att` suffix counts as a
/// ratio part only when its companion column exists on the same record.
fn split_column<'a>(
    name: &'a str,
    siblings: &BTreeMap<String, Option<i64>>,
) -> Option<(Side, &'a str, ColumnPart)> {
    let (side, rest) = Side::BOTH.into_iter().find_map(|side| {
        name.strip_prefix(side.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|rest| (side, rest))
    })?;

    if StatKey::from_slug(rest).is_known() {
        return Some((side, rest, ColumnPart::Value));
    }

    let companion =
        |stem: &str, suffix: &str| siblings.contains_key(&format!("{side}_{stem}_{suffix}"));

    if let Some(stem) = rest.strip_suffix("_made")
        && companion(stem, "att")
    {
        return Some((side, stem, ColumnPart::Made));
    }
    if let Some(stem) = rest.strip_suffix("_att")
        && companion(stem, "made")
    {
        return Some((side, stem, ColumnPart::Att));
    }
    if let Some(stem) = rest.strip_suffix("_seconds")
        && StatKey::from_slug(stem)
            .declared_shape()
            .is_none_or(|shape| shape == ValueShape::Duration)
    {
        return Some((side, stem, ColumnPart::Seconds));
    }

    Some((side, rest, ColumnPart::Value))
}

#[derive(Debug, Default, Clone, Copy)]
struct Parts {
    value: Option<i64>,
    made: Option<i64>,
    att: Option<i64>,
    seconds: Option<i64>,
}

impl Parts {
    fn typed(&self, shape: ValueShape) -> TypedValue {
        match shape {
            ValueShape::Integer => TypedValue::Integer(self.value),
            ValueShape::Ratio => TypedValue::Ratio {
                made: self.made,
                att: self.att,
            },
            ValueShape::Duration => TypedValue::Duration {
                seconds: self.seconds,
            },
        }
    }
}

/// Melts wide records back into long rows, one per game per stat.
///
/// Raw text fields are rendered from the typed values, so pivoting the
/// result with [`to_wide`] reproduces the input.
#[must_use]
pub fn to_long(records: &[WideRecord]) -> Vec<NormalizedStatRow> {
    let mut rows = Vec::new();

    for record in records {
        let mut stats: BTreeMap<(&str, ValueShape), [Parts; 2]> = BTreeMap::new();

        for (name, value) in &record.columns {
            let Some((side, stem, part)) = split_column(name, &record.columns) else {
                continue;
            };
            let shape = match part {
                ColumnPart::Value => ValueShape::Integer,
                ColumnPart::Made | ColumnPart::Att => ValueShape::Ratio,
                ColumnPart::Seconds => ValueShape::Duration,
            };
            let parts = &mut stats.entry((stem, shape)).or_default()[side_index(side)];
            match part {
                ColumnPart::Value => parts.value = *value,
                ColumnPart::Made => parts.made = *value,
                ColumnPart::Att => parts.att = *value,
                ColumnPart::Seconds => parts.seconds = *value,
            }
        }

        for ((stem, shape), [away_parts, home_parts]) in stats {
            let away = away_parts.typed(shape);
            let home = home_parts.typed(shape);
            rows.push(NormalizedStatRow {
                raw: RawStatRow {
                    game_id: record.game_id.clone(),
                    stat: stem.to_string(),
                    away_value: render(&away),
                    home_value: render(&home),
                    away_team: record.away_team.clone(),
                    home_team: record.home_team.clone(),
                    away_header: String::new(),
                    home_header: String::new(),
                },
                stat_norm: StatKey::from_slug(stem),
                away,
                home,
            });
        }
    }

    rows
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Away => 0,
        Side::Home => 1,
    }
}

/// Renders a typed value in the source's text form.
fn render(value: &TypedValue) -> String {
    match *value {
        TypedValue::Integer(Some(v)) => v.to_string(),
        TypedValue::Ratio {
            made: Some(made),
            att: Some(att),
        } => format!("{made}-{att}"),
        TypedValue::Duration { seconds: Some(s) } => format!("{}:{:02}", s / 60, s % 60),
        _ => String::new(),
    }
}

/// Long-format linescore row: one side of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinescoreRecord {
    pub game_id: String,
    pub side: Side,
    pub team: String,
    pub q1: Option<i64>,
    pub q2: Option<i64>,
    pub q3: Option<i64>,
    pub q4: Option<i64>,
    pub ot: Option<i64>,
    pub total: Option<i64>,
}

impl LinescoreRecord {
    #[must_use]
    pub fn periods(&self) -> Periods {
        Periods {
            q1: self.q1,
            q2: self.q2,
            q3: self.q3,
            q4: self.q4,
            ot: self.ot,
            total: self.total,
        }
    }
}

impl LineScore {
    /// Flattens into away and home tidy rows.
    #[must_use]
    pub fn to_records(&self) -> [LinescoreRecord; 2] {
        self.lines().map(|line| LinescoreRecord {
            game_id: self.game_id.clone(),
            side: line.side,
            team: line.team.clone(),
            q1: line.periods.q1,
            q2: line.periods.q2,
            q3: line.periods.q3,
            q4: line.periods.q4,
            ot: line.periods.ot,
            total: line.periods.total,
        })
    }
}

/// Drops repeated `(game, side)` rows, keeping the first.
#[must_use]
pub fn dedupe_linescores(records: &[LinescoreRecord]) -> Vec<LinescoreRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert((record.game_id.clone(), record.side)))
        .cloned()
        .collect()
}

/// Pivots linescore rows into one record per game with
/// `{side}_{q1..q4,ot,total}` columns.
#[must_use]
pub fn linescores_to_wide(records: &[LinescoreRecord]) -> Vec<WideRecord> {
    let mut wide: Vec<WideRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut columns = BTreeSet::new();

    for record in dedupe_linescores(records) {
        let index = *positions.entry(record.game_id.clone()).or_insert_with(|| {
            wide.push(WideRecord::new(&record.game_id, "", ""));
            wide.len() - 1
        });
        let target = &mut wide[index];

        match record.side {
            Side::Away => target.away_team.clone_from(&record.team),
            Side::Home => target.home_team.clone_from(&record.team),
        }
        for (period, value) in record.periods().named() {
            let name = format!("{}_{period}", record.side);
            columns.insert(name.clone());
            target.columns.insert(name, value);
        }
    }

    fill_columns(&mut wide, &columns);
    wide
}
