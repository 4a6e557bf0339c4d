//! Table Locator: finds a semantically identified table in page markup.
//!
//! The host hides some tables from default rendering by wrapping them in
//! HTML comments, so markup is un-hidden before parsing. A table is then
//! matched by explicit id, by class fragment, or by a content heuristic
//! when the id has been renamed across page formats.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, trace};

use super::grid::TableGrid;

/// Matches an HTML comment, capturing its inner content.
#[allow(clippy::expect_used)]
static COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--(.*?)-->").expect("comment regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector is valid"));

/// Content signals used when a table cannot be found by id or class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHeuristic {
    /// Accepted first-column header labels, compared lowercase.
    pub header_labels: &'static [&'static str],
    /// Phrases that, found in any first-column value, mark a match.
    pub value_signals: &'static [&'static str],
    /// Candidates narrower than this are skipped.
    pub min_columns: usize,
}

/// How to recognise a target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentity {
    /// Stable structural id.
    pub id: &'static str,
    /// Class fragment accepted when the id is absent.
    pub class_fragment: Option<&'static str>,
    /// Content heuristic accepted when neither id nor class match.
    pub heuristic: Option<ContentHeuristic>,
}

impl TableIdentity {
    /// The team totals table of a box-score page.
    #[must_use]
    pub fn team_stats() -> Self {
        Self {
            id: "team_stats",
            class_fragment: None,
            heuristic: Some(ContentHeuristic {
                header_labels: &["team stats", "stat", "team_stats", "statistics"],
                value_signals: &[
                    "total yards",
                    "turnovers",
                    "first downs",
                    "time of possession",
                    "penalties",
                ],
                min_columns: 3,
            }),
        }
    }

    /// The per-period scoring table of a box-score page.
    #[must_use]
    pub fn linescore() -> Self {
        Self {
            id: "linescore",
            class_fragment: Some("linescore"),
            heuristic: None,
        }
    }
}

/// Strips comment delimiters, keeping the commented content verbatim.
#[must_use]
pub fn uncomment_html(markup: &str) -> Cow<'_, str> {
    COMMENT_PATTERN.replace_all(markup, "$1")
}

/// Finds the table matching `identity`.
///
/// Returns `None` when the page has no such table; that is a valid
/// "no data" result, not an error.
#[must_use]
pub fn locate(markup: &str, identity: &TableIdentity) -> Option<TableGrid> {
    let document = Html::parse_document(&uncomment_html(markup));
    let tables: Vec<TableGrid> = document
        .select(&TABLE_SELECTOR)
        .map(TableGrid::from_element)
        .collect();

    trace!(candidates = tables.len(), id = identity.id, "scanning tables");

    if let Some(found) = tables
        .iter()
        .find(|t| t.id.as_deref() == Some(identity.id) && !t.rows.is_empty())
    {
        debug!(id = identity.id, "table located by id");
        return Some(found.clone());
    }

    if let Some(fragment) = identity.class_fragment
        && let Some(found) = tables.iter().find(|t| t.has_class_containing(fragment))
    {
        debug!(id = identity.id, fragment, "table located by class");
        return Some(found.clone());
    }

    if let Some(heuristic) = &identity.heuristic
        && let Some(found) = tables.into_iter().find(|t| matches_heuristic(t, heuristic))
    {
        debug!(id = identity.id, "table located by content heuristic");
        return Some(found);
    }

    debug!(id = identity.id, "table not found");
    None
}

/// Accepts a candidate whose first header or first-column values carry a
/// domain signal. Presence of a table alone is never enough.
fn matches_heuristic(table: &TableGrid, heuristic: &ContentHeuristic) -> bool {
    if table.column_count() < heuristic.min_columns || table.body_rows().next().is_none() {
        return false;
    }

    let first_header = table.header_label(0).trim().to_lowercase();
    if heuristic.header_labels.contains(&first_header.as_str()) {
        return true;
    }

    table.first_column().any(|value| {
        let value = value.to_lowercase();
        heuristic
            .value_signals
            .iter()
            .any(|signal| value.contains(signal))
    })
}
