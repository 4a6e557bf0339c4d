//! Row Extractor: turns located tables into structured records.
//!
//! Semantic fields are looked up by `data-stat` attribute aliases first.
//! When the attributes are missing or relabeled (older page formats),
//! positional rules fill whatever the attribute pass left empty.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::grid::{Row, TableGrid};

const LABEL_KEYS: &[&str] = &["stat"];
const AWAY_VALUE_KEYS: &[&str] = &["vis_stat", "away_stat", "visitor_stat"];
const HOME_VALUE_KEYS: &[&str] = &["home_stat"];

const TEAM_KEYS: &[&str] = &["team", "tm"];
const Q1_KEYS: &[&str] = &["q1", "1", "pts_q1", "pts1"];
const Q2_KEYS: &[&str] = &["q2", "2", "pts_q2", "pts2"];
const Q3_KEYS: &[&str] = &["q3", "3", "pts_q3", "pts3"];
const Q4_KEYS: &[&str] = &["q4", "4", "pts_q4", "pts4"];
const OT_KEYS: &[&str] = &["ot", "pts_ot"];
const TOTAL_KEYS: &[&str] = &["total", "t", "pts", "pts_total"];

/// Logo credits that leak into team cells.
const JUNK_STRINGS: &[&str] = &["via Sports Logos.net", "About logos"];

/// Which team a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Away,
    Home,
}

impl Side {
    /// Both sides, away first.
    pub const BOTH: [Side; 2] = [Side::Away, Side::Home];

    /// Column prefix for this side.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Away => "away",
            Self::Home => "home",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One team-totals row as found on the page. Values are untouched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatRow {
    pub game_id: String,
    /// Free-text stat label.
    pub stat: String,
    pub away_value: String,
    pub home_value: String,
    pub away_team: String,
    pub home_team: String,
    /// Column header above the away values.
    pub away_header: String,
    /// Column header above the home values.
    pub home_header: String,
}

impl RawStatRow {
    /// Returns the raw value for `side`.
    #[must_use]
    pub fn value(&self, side: Side) -> &str {
        match side {
            Side::Away => &self.away_value,
            Side::Home => &self.home_value,
        }
    }
}

/// Period scores for one side of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Periods {
    pub q1: Option<i64>,
    pub q2: Option<i64>,
    pub q3: Option<i64>,
    pub q4: Option<i64>,
    pub ot: Option<i64>,
    pub total: Option<i64>,
}

impl Periods {
    /// Applies the positional rules to an ordered run of numeric cells.
    ///
    /// - up to 4 values: quarters in order, no overtime, no total
    /// - 5 values: quarters only; the fifth is ambiguous and left unassigned
    /// - 6 or more: values between Q4 and the last are summed into
    ///   overtime, the last is the game total
    #[must_use]
    pub fn from_positional(values: &[i64]) -> Self {
        // A short row is a partial quarter run; its last value is never a total.
        let mut periods = Self {
            q1: values.first().copied(),
            q2: values.get(1).copied(),
            q3: values.get(2).copied(),
            q4: values.get(3).copied(),
            ..Self::default()
        };

        if values.len() > 5 {
            let overtime = &values[4..values.len() - 1];
            periods.ot = overtime.iter().try_fold(0i64, |acc, v| acc.checked_add(*v));
            if periods.ot.is_none() {
                debug!(?overtime, "overtime sum overflows, leaving it empty");
            }
            periods.total = values.last().copied();
        }

        periods
    }

    /// Fills fields still `None` from `fallback`. Present values win.
    fn fill_from(&mut self, fallback: &Periods) {
        self.q1 = self.q1.or(fallback.q1);
        self.q2 = self.q2.or(fallback.q2);
        self.q3 = self.q3.or(fallback.q3);
        self.q4 = self.q4.or(fallback.q4);
        self.ot = self.ot.or(fallback.ot);
        self.total = self.total.or(fallback.total);
    }

    /// Returns the named period, used for wide column names.
    #[must_use]
    pub fn named(&self) -> [(&'static str, Option<i64>); 6] {
        [
            ("q1", self.q1),
            ("q2", self.q2),
            ("q3", self.q3),
            ("q4", self.q4),
            ("ot", self.ot),
            ("total", self.total),
        ]
    }
}

/// One side's row of the linescore table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideLine {
    pub side: Side,
    pub team: String,
    pub periods: Periods,
}

/// Both sides of a game's linescore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineScore {
    /// Lowercased game id.
    pub game_id: String,
    pub away: SideLine,
    pub home: SideLine,
}

impl LineScore {
    /// Returns both side lines, away first.
    #[must_use]
    pub fn lines(&self) -> [&SideLine; 2] {
        [&self.away, &self.home]
    }
}

/// Extracts team-totals rows from a located table.
///
/// Only the first three columns matter: label, away value, home value.
/// Rows with an empty label, a repeated `Stat` header, or two empty values
/// are dropped. Returns an empty vector for tables narrower than three
/// columns.
#[must_use]
pub fn extract_stat_rows(
    grid: &TableGrid,
    game_id: &str,
    away_team: &str,
    home_team: &str,
) -> Vec<RawStatRow> {
    if grid.column_count() < 3 {
        debug!(game_id, columns = grid.column_count(), "team totals table too narrow");
        return Vec::new();
    }

    let away_header = grid.header_label(1);
    let home_header = grid.header_label(2);

    let rows: Vec<RawStatRow> = grid
        .body_rows()
        .filter_map(|row| {
            let stat = field(row, LABEL_KEYS, 0);
            if stat.is_empty() || stat.eq_ignore_ascii_case("stat") {
                return None;
            }

            let away_value = field(row, AWAY_VALUE_KEYS, 1);
            let home_value = field(row, HOME_VALUE_KEYS, 2);
            if away_value.is_empty() && home_value.is_empty() {
                trace!(game_id, %stat, "dropping row without values");
                return None;
            }

            Some(RawStatRow {
                game_id: game_id.to_string(),
                stat,
                away_value,
                home_value,
                away_team: away_team.to_string(),
                home_team: home_team.to_string(),
                away_header: away_header.clone(),
                home_header: home_header.clone(),
            })
        })
        .collect();

    debug!(game_id, rows = rows.len(), "extracted team totals");
    rows
}

/// Extracts the away and home lines from a located linescore table.
///
/// The first two data rows are away then home. Returns `None` when the
/// table has fewer than two data rows. The game id is lowercased.
#[must_use]
pub fn extract_linescore(grid: &TableGrid, game_id: &str) -> Option<LineScore> {
    let mut rows = grid.body_rows();
    let away_row = rows.next()?;
    let home_row = rows.next()?;

    Some(LineScore {
        game_id: game_id.to_lowercase(),
        away: side_line(away_row, Side::Away),
        home: side_line(home_row, Side::Home),
    })
}

/// Attribute-keyed text of a field, falling back to the cell at `position`
/// when no attribute cell exists or the attribute cell is empty.
fn field(row: &Row, aliases: &[&str], position: usize) -> String {
    row.cell_by_stat(aliases)
        .map(|cell| cell.text.trim())
        .filter(|text| !text.is_empty())
        .or_else(|| row.cell(position).map(|cell| cell.text.trim()))
        .unwrap_or_default()
        .to_string()
}

fn side_line(row: &Row, side: Side) -> SideLine {
    let fallback = positional_line(row);

    let attribute_team = row
        .cell_by_stat(TEAM_KEYS)
        .map(|cell| {
            cell.links
                .first()
                .map(|link| link.text.trim())
                .filter(|text| !text.is_empty())
                .unwrap_or(cell.text.as_str())
                .to_string()
        })
        .map(|name| clean_team_name(&name))
        .unwrap_or_default();

    let team = if attribute_team.is_empty() {
        fallback.team.clone()
    } else {
        attribute_team
    };

    let mut periods = Periods {
        q1: int_field(row, Q1_KEYS),
        q2: int_field(row, Q2_KEYS),
        q3: int_field(row, Q3_KEYS),
        q4: int_field(row, Q4_KEYS),
        ot: int_field(row, OT_KEYS),
        total: int_field(row, TOTAL_KEYS),
    };
    periods.fill_from(&fallback.periods);

    SideLine {
        side,
        team,
        periods,
    }
}

fn int_field(row: &Row, aliases: &[&str]) -> Option<i64> {
    row.cell_by_stat(aliases)
        .and_then(|cell| cell.text.trim().parse().ok())
}

struct PositionalLine {
    team: String,
    periods: Periods,
}

/// Reads a row without relying on attributes: the entity column is the
/// first cell linking to `/teams/`, else the first non-empty cell, and
/// numeric cells after it form the period sequence.
fn positional_line(row: &Row) -> PositionalLine {
    let linked = row.cells.iter().enumerate().find_map(|(index, cell)| {
        cell.links
            .iter()
            .find(|link| link.href.contains("/teams/"))
            .map(|link| (index, link.text.clone()))
    });

    let entity = linked.or_else(|| {
        row.cells
            .iter()
            .enumerate()
            .find(|(_, cell)| !cell.text.is_empty())
            .map(|(index, cell)| (index, cell.text.clone()))
    });

    let Some((index, team)) = entity else {
        return PositionalLine {
            team: String::new(),
            periods: Periods::default(),
        };
    };

    let values: Vec<i64> = row.cells[index + 1..]
        .iter()
        .filter_map(|cell| cell.text.trim().parse().ok())
        .collect();

    PositionalLine {
        team: clean_team_name(&team),
        periods: Periods::from_positional(&values),
    }
}

fn clean_team_name(name: &str) -> String {
    JUNK_STRINGS
        .iter()
        .fold(name.to_string(), |acc, junk| acc.replace(junk, ""))
        .trim()
        .to_string()
}
