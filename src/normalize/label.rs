//! Stat label normalization and the canonical stat key table.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Runs of characters that are not slug-safe.
#[allow(clippy::expect_used)]
static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9_]+").expect("slug regex is valid") // Static pattern, safe to panic
});

/// Slug used when a label has no slug-safe characters at all.
pub const UNLABELED: &str = "unlabeled";

/// How a stat's values are written in the source cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueShape {
    /// A whole number, e.g. `350`.
    Integer,
    /// Made of attempted, e.g. `5-12` or `5/12`.
    Ratio,
    /// A clock reading, e.g. `31:04`.
    Duration,
}

/// Canonical identifier for a stat.
///
/// Labels the alias table does not know become [`StatKey::Other`] holding
/// their slug, so no row is ever discarded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatKey {
    FirstDowns,
    TotalYards,
    RushYards,
    PassYards,
    Turnovers,
    FumblesLost,
    IntsThrown,
    Penalties,
    PenaltiesYards,
    ThirdDownConv,
    FourthDownConv,
    TimeOfPossession,
    Other(String),
}

impl StatKey {
    /// Every known key.
    pub const KNOWN: [StatKey; 12] = [
        StatKey::FirstDowns,
        StatKey::TotalYards,
        StatKey::RushYards,
        StatKey::PassYards,
        StatKey::Turnovers,
        StatKey::FumblesLost,
        StatKey::IntsThrown,
        StatKey::Penalties,
        StatKey::PenaltiesYards,
        StatKey::ThirdDownConv,
        StatKey::FourthDownConv,
        StatKey::TimeOfPossession,
    ];

    /// The key as used in column names.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FirstDowns => "first_downs",
            Self::TotalYards => "total_yards",
            Self::RushYards => "rush_yards",
            Self::PassYards => "pass_yards",
            Self::Turnovers => "turnovers",
            Self::FumblesLost => "fumbles_lost",
            Self::IntsThrown => "ints_thrown",
            Self::Penalties => "penalties",
            Self::PenaltiesYards => "penalties_yards",
            Self::ThirdDownConv => "third_down_conv",
            Self::FourthDownConv => "fourth_down_conv",
            Self::TimeOfPossession => "time_of_possession",
            Self::Other(slug) => slug,
        }
    }

    /// Value shape declared for known keys; `None` for slugs.
    #[must_use]
    pub fn declared_shape(&self) -> Option<ValueShape> {
        match self {
            Self::ThirdDownConv | Self::FourthDownConv => Some(ValueShape::Ratio),
            Self::TimeOfPossession => Some(ValueShape::Duration),
            Self::Other(_) => None,
            _ => Some(ValueShape::Integer),
        }
    }

    /// Maps a slug back to a known key when it names one.
    #[must_use]
    pub fn from_slug(slug: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|key| key.as_str() == slug)
            .unwrap_or_else(|| Self::Other(slug.to_string()))
    }

    /// Whether this key came from the alias table or names a known key.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a free-text stat label to its canonical key.
///
/// The label is lowercased, dash variants are unified and whitespace is
/// collapsed before the alias lookup. Unknown labels become a slug of
/// their own text.
///
/// # Examples
///
/// ```
/// use boxscore_core::normalize::{StatKey, normalize_label};
///
/// assert_eq!(normalize_label("3rd Down Conv."), StatKey::ThirdDownConv);
/// assert_eq!(normalize_label("Sacked-Yards").as_str(), "sacked_yards");
/// ```
#[must_use]
pub fn normalize_label(label: &str) -> StatKey {
    let cleaned = clean_label(label);
    alias(&cleaned).unwrap_or_else(|| StatKey::from_slug(&slugify(&cleaned)))
}

/// Collapses non-alphanumeric runs of an already-lowercased label to `_`.
#[must_use]
pub fn slugify(cleaned: &str) -> String {
    let slug = NON_SLUG.replace_all(cleaned, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        UNLABELED.to_string()
    } else {
        slug.to_string()
    }
}

fn clean_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .replace(['\u{2013}', '\u{2014}'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn alias(cleaned: &str) -> Option<StatKey> {
    let key = match cleaned {
        "first downs" | "firstdowns" => StatKey::FirstDowns,
        "total yards" | "total yds" | "tot yards" | "tot yds" => StatKey::TotalYards,
        "rushing yards" | "rush yards" | "rush-yds" => StatKey::RushYards,
        "passing yards" | "pass yards" | "pass-yds" => StatKey::PassYards,
        "turnovers" | "to" => StatKey::Turnovers,
        "fumbles lost" | "fum lost" => StatKey::FumblesLost,
        "interceptions thrown" | "int thrown" | "interceptions" => StatKey::IntsThrown,
        "penalties" => StatKey::Penalties,
        "penalties-yards" | "pen-yds" | "penalties/yds" => StatKey::PenaltiesYards,
        "third down conv." | "third-down conv." | "3rd down conv." | "third down conv" => {
            StatKey::ThirdDownConv
        }
        "fourth down conv." | "4th down conv." | "fourth down conv" => StatKey::FourthDownConv,
        "time of possession" | "possession time" | "time of poss" => StatKey::TimeOfPossession,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_third_down_spellings_share_a_key() {
        let keys: Vec<StatKey> = ["Third Down Conv.", "3rd down conv.", "third-down conv."]
            .into_iter()
            .map(normalize_label)
            .collect();
        assert!(keys.iter().all(|k| *k == StatKey::ThirdDownConv));
    }

    #[test]
    fn test_whitespace_and_dash_variants() {
        assert_eq!(normalize_label("  Total \t  Yards "), StatKey::TotalYards);
        assert_eq!(normalize_label("Pen\u{2013}Yds"), StatKey::PenaltiesYards);
        assert_eq!(normalize_label("Penalties\u{2014}Yards"), StatKey::PenaltiesYards);
        assert_eq!(normalize_label("TO"), StatKey::Turnovers);
    }

    #[test]
    fn test_unknown_labels_become_slugs() {
        assert_eq!(
            normalize_label("Sacked-Yards"),
            StatKey::Other("sacked_yards".to_string())
        );
        assert_eq!(normalize_label("Net Pass Yards").as_str(), "net_pass_yards");
        assert_eq!(normalize_label("Rush-Yds-TDs").as_str(), "rush_yds_tds");
        assert_eq!(normalize_label("--").as_str(), UNLABELED);
    }

    #[test]
    fn test_slug_naming_a_known_key_resolves_to_it() {
        assert_eq!(normalize_label("Total_Yards"), StatKey::TotalYards);
        assert_eq!(normalize_label("time_of_possession"), StatKey::TimeOfPossession);
    }

    #[test]
    fn test_declared_shapes() {
        assert_eq!(StatKey::TotalYards.declared_shape(), Some(ValueShape::Integer));
        assert_eq!(StatKey::PenaltiesYards.declared_shape(), Some(ValueShape::Integer));
        assert_eq!(StatKey::FourthDownConv.declared_shape(), Some(ValueShape::Ratio));
        assert_eq!(StatKey::TimeOfPossession.declared_shape(), Some(ValueShape::Duration));
        assert_eq!(StatKey::Other("x".into()).declared_shape(), None);
    }

    #[test]
    fn test_known_keys_round_trip_through_slug() {
        for key in StatKey::KNOWN {
            assert_eq!(StatKey::from_slug(key.as_str()), key);
            assert!(key.is_known());
        }
    }
}
