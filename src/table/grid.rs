//! Owned row/column form of an HTML table.
//!
//! `scraper::Html` is not `Send`, so a located table is copied out of the
//! document into a [`TableGrid`] that can be handed across await points and
//! inspected without holding the parsed document.

use scraper::ElementRef;

/// A hyperlink found inside a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Raw `href` attribute.
    pub href: String,
    /// Whitespace-collapsed link text.
    pub text: String,
}

/// One `th` or `td` cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    /// Whitespace-collapsed, trimmed text content.
    pub text: String,
    /// Whether the cell is a `th`.
    pub is_header: bool,
    /// Value of the `data-stat` attribute, if any.
    pub data_stat: Option<String>,
    /// Links in document order.
    pub links: Vec<Link>,
}

/// Which table section a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSection {
    Head,
    Body,
    Foot,
}

/// One `tr` with its direct cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub section: RowSection,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Returns the cell at `index`.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Returns the first cell whose `data-stat` matches one of `aliases`,
    /// trying aliases in order of preference.
    #[must_use]
    pub fn cell_by_stat(&self, aliases: &[&str]) -> Option<&Cell> {
        aliases.iter().find_map(|alias| {
            self.cells
                .iter()
                .find(|cell| cell.data_stat.as_deref() == Some(*alias))
        })
    }

    fn is_all_header(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|cell| cell.is_header)
    }
}

/// A table copied out of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableGrid {
    /// The table's `id` attribute.
    pub id: Option<String>,
    /// The table's `class` attribute split on whitespace.
    pub classes: Vec<String>,
    /// Rows in document order. Rows of nested tables are not included.
    pub rows: Vec<Row>,
}

impl TableGrid {
    /// Copies a `table` element into owned form.
    #[must_use]
    pub fn from_element(table: ElementRef<'_>) -> Self {
        let mut rows = Vec::new();

        for child in table.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "thead" => collect_rows(child, RowSection::Head, &mut rows),
                "tbody" => collect_rows(child, RowSection::Body, &mut rows),
                "tfoot" => collect_rows(child, RowSection::Foot, &mut rows),
                "tr" => rows.push(read_row(child, RowSection::Body)),
                _ => {}
            }
        }

        Self {
            id: table.value().attr("id").map(str::to_string),
            classes: table.value().classes().map(str::to_string).collect(),
            rows,
        }
    }

    /// Returns the row that names the columns.
    ///
    /// This is the last `thead` row, or when the table has no `thead`, the
    /// last of the leading body rows made only of `th` cells.
    #[must_use]
    pub fn header_row(&self) -> Option<&Row> {
        let head = self
            .rows
            .iter()
            .rev()
            .find(|row| row.section == RowSection::Head);
        if head.is_some() {
            return head;
        }
        self.leading_header_rows().last()
    }

    /// Returns the data rows: body rows after any promoted header rows.
    pub fn body_rows(&self) -> impl Iterator<Item = &Row> {
        let has_head = self.rows.iter().any(|row| row.section == RowSection::Head);
        let skip = if has_head {
            0
        } else {
            self.leading_header_rows().count()
        };
        self.rows
            .iter()
            .filter(|row| row.section == RowSection::Body)
            .skip(skip)
    }

    /// Returns the text of the header cell at `index`, or an empty string.
    #[must_use]
    pub fn header_label(&self, index: usize) -> String {
        self.header_row()
            .and_then(|row| row.cell(index))
            .map(|cell| cell.text.clone())
            .unwrap_or_default()
    }

    /// Returns the widest row's cell count.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }

    /// Returns whether the table has the given class, or a class containing
    /// `fragment`.
    #[must_use]
    pub fn has_class_containing(&self, fragment: &str) -> bool {
        self.classes.iter().any(|class| class.contains(fragment))
    }

    /// Returns the first-column text of every data row.
    pub fn first_column(&self) -> impl Iterator<Item = &str> {
        self.body_rows()
            .filter_map(|row| row.cell(0))
            .map(|cell| cell.text.as_str())
    }

    fn leading_header_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(|row| row.section == RowSection::Body)
            .take_while(|row| row.is_all_header())
    }
}

fn collect_rows(section: ElementRef<'_>, kind: RowSection, rows: &mut Vec<Row>) {
    rows.extend(
        section
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "tr")
            .map(|tr| read_row(tr, kind)),
    );
}

fn read_row(tr: ElementRef<'_>, section: RowSection) -> Row {
    let cells = tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "th" | "td"))
        .map(read_cell)
        .collect();
    Row { section, cells }
}

fn read_cell(el: ElementRef<'_>) -> Cell {
    let links = el
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|node| node.value().name() == "a")
        .filter_map(|a| {
            a.value().attr("href").map(|href| Link {
                href: href.to_string(),
                text: collapse_text(a),
            })
        })
        .collect();

    Cell {
        text: collapse_text(el),
        is_header: el.value().name() == "th",
        data_stat: el.value().attr("data-stat").map(str::to_string),
        links,
    }
}

/// Joins an element's text nodes and collapses runs of whitespace.
fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
