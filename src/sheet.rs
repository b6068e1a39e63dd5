//! An in-memory sheet: column titles and rows of cell text.

use std::fmt::{self, Display};

/// Error building a [`Sheet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// The grid has no rows at all
    NoData,
}

impl Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::NoData => write!(f, "sheet has no rows"),
        }
    }
}

impl std::error::Error for SheetError {}

impl miette::Diagnostic for SheetError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(match self {
            SheetError::NoData => "cellcast::sheet::no_data",
        }))
    }
}

/// Column titles and data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    titles: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    /// A sheet from titles and rows.
    pub fn new(titles: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Sheet { titles, rows }
    }

    /// A sheet from a raw grid of cells.
    ///
    /// With `first_row_titles`, row 0 holds the titles and the rest are data.
    /// Otherwise every row is data and the titles are the column positions
    /// `"0"`, `"1"`, ... up to the widest row.
    pub fn from_grid(grid: Vec<Vec<String>>, first_row_titles: bool) -> Result<Sheet, SheetError> {
        if grid.is_empty() {
            return Err(SheetError::NoData);
        }
        if first_row_titles {
            let mut rows = grid.into_iter();
            let titles = rows.next().unwrap_or_default();
            return Ok(Sheet {
                titles,
                rows: rows.collect(),
            });
        }
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        Ok(Sheet {
            titles: (0..width).map(|i| i.to_string()).collect(),
            rows: grid,
        })
    }

    /// The column titles.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// The data rows. Rows may be shorter than the title row.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// The cell at `row`, `column`; missing cells read as empty text.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }

    /// A sheet with only the rows `keep` accepts.
    pub fn filter(&self, keep: impl Fn(&[String]) -> bool) -> Sheet {
        Sheet {
            titles: self.titles.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Drops, in place, the rows `keep` rejects.
    pub fn retain_rows(&mut self, keep: impl Fn(&[String]) -> bool) {
        self.rows.retain(|r| keep(r));
    }
}

/// Builds a grid from string literals, for tests and small tables.
///
/// ```
/// let grid = cellcast::grid(&[&["id", "name"], &["1", "ada"]]);
/// let sheet = cellcast::Sheet::from_grid(grid, true).unwrap();
/// assert_eq!(sheet.titles(), ["id", "name"]);
/// ```
pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}
