//! Stat Normalizer: canonical keys and typed values for raw totals rows.
//!
//! Normalization builds a new record per row and never mutates its input,
//! so normalizing the same row twice yields identical results.

mod label;
mod value;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::{RawStatRow, Side};

pub use label::{StatKey, UNLABELED, ValueShape, normalize_label, slugify};
pub use value::{TypedValue, infer_shape, parse_duration, parse_int, parse_ratio};

/// A raw row with its canonical key and typed side values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedStatRow {
    pub raw: RawStatRow,
    pub stat_norm: StatKey,
    pub away: TypedValue,
    pub home: TypedValue,
}

impl NormalizedStatRow {
    /// The shape shared by both sides.
    #[must_use]
    pub fn shape(&self) -> ValueShape {
        self.away.shape()
    }

    /// Returns the typed value for `side`.
    #[must_use]
    pub fn value(&self, side: Side) -> &TypedValue {
        match side {
            Side::Away => &self.away,
            Side::Home => &self.home,
        }
    }

    /// Flattens into the stable tidy column set.
    #[must_use]
    pub fn to_tidy(&self) -> TidyRecord {
        let raw = &self.raw;
        TidyRecord {
            game_id: raw.game_id.clone(),
            stat: raw.stat.clone(),
            stat_norm: self.stat_norm.to_string(),
            away_val_raw: raw.away_value.clone(),
            away_val_int: self.away.int(),
            away_made: self.away.made(),
            away_att: self.away.att(),
            away_seconds: self.away.seconds(),
            home_val_raw: raw.home_value.clone(),
            home_val_int: self.home.int(),
            home_made: self.home.made(),
            home_att: self.home.att(),
            home_seconds: self.home.seconds(),
            away_team: raw.away_team.clone(),
            home_team: raw.home_team.clone(),
            away_header: raw.away_header.clone(),
            home_header: raw.home_header.clone(),
        }
    }
}

/// Normalizes one raw row.
///
/// Known keys use their declared shape. Slugs get a shape inferred from
/// both side values. Values that fail to parse are left `None` and logged.
#[must_use]
pub fn normalize(raw: &RawStatRow) -> NormalizedStatRow {
    let stat_norm = normalize_label(&raw.stat);
    let shape = stat_norm
        .declared_shape()
        .unwrap_or_else(|| infer_shape(&[raw.away_value.as_str(), raw.home_value.as_str()]));

    let [away, home] = Side::BOTH.map(|side| {
        let text = raw.value(side);
        let typed = TypedValue::parse(shape, text);
        if typed.is_degraded() && !text.trim().is_empty() {
            debug!(
                game_id = %raw.game_id,
                stat = %stat_norm,
                %side,
                raw_value = text,
                ?shape,
                "value did not parse for its shape"
            );
        }
        typed
    });

    NormalizedStatRow {
        raw: raw.clone(),
        stat_norm,
        away,
        home,
    }
}

/// Normalizes every row in order.
#[must_use]
pub fn normalize_rows(rows: &[RawStatRow]) -> Vec<NormalizedStatRow> {
    rows.iter().map(normalize).collect()
}

/// Long-format output row: one stat of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub game_id: String,
    pub stat: String,
    pub stat_norm: String,
    pub away_val_raw: String,
    pub away_val_int: Option<i64>,
    pub away_made: Option<i64>,
    pub away_att: Option<i64>,
    pub away_seconds: Option<i64>,
    pub home_val_raw: String,
    pub home_val_int: Option<i64>,
    pub home_made: Option<i64>,
    pub home_att: Option<i64>,
    pub home_seconds: Option<i64>,
    pub away_team: String,
    pub home_team: String,
    pub away_header: String,
    pub home_header: String,
}

impl TidyRecord {
    /// Recovers the raw row this record was built from.
    #[must_use]
    pub fn to_raw(&self) -> RawStatRow {
        RawStatRow {
            game_id: self.game_id.clone(),
            stat: self.stat.clone(),
            away_value: self.away_val_raw.clone(),
            home_value: self.home_val_raw.clone(),
            away_team: self.away_team.clone(),
            home_team: self.home_team.clone(),
            away_header: self.away_header.clone(),
            home_header: self.home_header.clone(),
        }
    }
}
