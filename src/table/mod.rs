//! HTML table location and row extraction for box-score pages.
//!
//! # Example
//!
//! ```
//! use boxscore_core::table::{TableIdentity, extract_stat_rows, locate};
//!
//! let markup = r#"<div><!--
//!   <table id="team_stats">
//!     <thead><tr><th>Stat</th><th>NYJ</th><th>DET</th></tr></thead>
//!     <tbody><tr><th>Total Yards</th><td>350</td><td>410</td></tr></tbody>
//!   </table>
//! --></div>"#;
//!
//! let grid = locate(markup, &TableIdentity::team_stats()).unwrap();
//! let rows = extract_stat_rows(&grid, "g1", "New York Jets", "Detroit Lions");
//! assert_eq!(rows[0].away_value, "350");
//! ```

mod extract;
mod grid;
mod locate;

pub use extract::{
    LineScore, Periods, RawStatRow, Side, SideLine, extract_linescore, extract_stat_rows,
};
pub use grid::{Cell, Link, Row, RowSection, TableGrid};
pub use locate::{ContentHeuristic, TableIdentity, locate, uncomment_html};
