//! Materializing typed records from sheet rows.

use std::fmt::{self, Display};

use crate::coerce::{CoerceOptions, Coercer};
use crate::error::CoerceError;
use crate::index::{FieldIndex, IndexOptions};
use crate::shape::{Def, Shape};
use crate::sheet::Sheet;
use crate::value::Record;

/// How a [`Reader`] maps columns onto fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Map columns by title through a [`FieldIndex`]; otherwise column `i`
    /// feeds the `i`-th top-level field
    pub with_titles: bool,
    /// How titles are matched to fields
    pub index: IndexOptions,
    /// How cells are coerced
    pub coerce: CoerceOptions,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            with_titles: true,
            index: IndexOptions::default(),
            coerce: CoerceOptions::default(),
        }
    }
}

impl ReaderConfig {
    /// Sets title-based mapping.
    pub fn with_titles(mut self, with_titles: bool) -> Self {
        self.with_titles = with_titles;
        self
    }

    /// Sets the index options.
    pub fn index(mut self, index: IndexOptions) -> Self {
        self.index = index;
        self
    }

    /// Sets the coercion options.
    pub fn coerce(mut self, coerce: CoerceOptions) -> Self {
        self.coerce = coerce;
        self
    }
}

/// Error that prevents materialization altogether.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderError {
    /// Records can only be materialized into structs
    NotAStruct {
        /// The offending shape
        type_identifier: String,
    },
}

impl Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderError::NotAStruct { type_identifier } => {
                write!(f, "cannot read rows into {type_identifier}, it is not a struct")
            }
        }
    }
}

impl std::error::Error for ReaderError {}

impl miette::Diagnostic for ReaderError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(match self {
            ReaderError::NotAStruct { .. } => "cellcast::reader::not_a_struct",
        }))
    }
}

/// A cell that failed to coerce. Its field keeps the zero value.
#[derive(Debug, Clone, PartialEq)]
pub struct CellError {
    /// Data row, counted from 0
    pub row: usize,
    /// Column, counted from 0
    pub column: usize,
    /// The column's title
    pub title: String,
    /// Why coercion failed
    pub error: CoerceError,
}

impl Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} column {} ({}): {}",
            self.row, self.column, self.title, self.error
        )
    }
}

impl std::error::Error for CellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// The records of a sheet, one per row, and the cells that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    /// One record per data row
    pub records: Vec<Record>,
    /// Cells that did not coerce
    pub errors: Vec<CellError>,
}

/// Reads sheets into records.
#[derive(Debug, Clone, Default)]
pub struct Reader {
    config: ReaderConfig,
}

impl Reader {
    /// A reader using `config`.
    pub fn new(config: ReaderConfig) -> Self {
        Reader { config }
    }

    /// The configuration in effect.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Builds one record of `shape` per row of `sheet`.
    ///
    /// Cells that fail to coerce are logged and collected in
    /// [`Materialized::errors`]; they never abort the read.
    pub fn materialize(&self, shape: &Shape, sheet: &Sheet) -> Result<Materialized, ReaderError> {
        let Def::Struct(def) = &shape.def else {
            return Err(ReaderError::NotAStruct {
                type_identifier: shape.type_identifier.clone(),
            });
        };
        if shape.is_time_like() {
            return Err(ReaderError::NotAStruct {
                type_identifier: shape.type_identifier.clone(),
            });
        }

        let columns = self.column_targets(shape, sheet);
        let coercer = Coercer::new(self.config.coerce);
        let mut out = Materialized {
            records: Vec::with_capacity(sheet.rows().len()),
            errors: Vec::new(),
        };

        for (row_index, row) in sheet.rows().iter().enumerate() {
            let mut record = Record::zero(shape, def);
            for (column, cell) in row.iter().enumerate() {
                let Some(Some(target)) = columns.get(column) else {
                    continue;
                };
                match coercer.coerce(&target.shape, cell) {
                    Ok(value) => {
                        record.set_path(&target.path, value);
                    }
                    Err(error) => {
                        let title = sheet.titles().get(column).cloned().unwrap_or_default();
                        // JSON errors point inside the cell; show just that part
                        let near = error.span.and_then(|s| s.snippet(cell)).unwrap_or(cell.as_str());
                        log::warn!(
                            "row {row_index} column {column} ({title}): cannot read {near:?} as {}: {error}",
                            target.shape
                        );
                        out.errors.push(CellError {
                            row: row_index,
                            column,
                            title,
                            error,
                        });
                    }
                }
            }
            out.records.push(record);
        }

        log::debug!(
            "materialize: {} records of {}, {} cell errors",
            out.records.len(),
            shape.type_identifier,
            out.errors.len()
        );
        Ok(out)
    }

    /// The field each column feeds, if any.
    fn column_targets(&self, shape: &Shape, sheet: &Sheet) -> Vec<Option<Target>> {
        if !self.config.with_titles {
            let fields = shape.struct_def().map_or(&[][..], |d| &d.fields[..]);
            let width = sheet.rows().iter().map(Vec::len).max().unwrap_or(0);
            if width > fields.len() {
                log::debug!(
                    "materialize: ignoring {} surplus columns for {}",
                    width - fields.len(),
                    shape.type_identifier
                );
            }
            return fields
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    Some(Target {
                        shape: f.shape.clone(),
                        path: vec![i],
                    })
                })
                .collect();
        }

        let index = FieldIndex::build(shape, &self.config.index);
        sheet
            .titles()
            .iter()
            .map(|title| match index.get(title) {
                Some(field) => Some(Target {
                    shape: field.shape.clone(),
                    path: field.path.clone(),
                }),
                None => {
                    match index.suggest(title) {
                        Some(suggestion) => log::warn!(
                            "column {title:?} matches no field of {}, did you mean {suggestion:?}?",
                            shape.type_identifier
                        ),
                        None => log::warn!(
                            "column {title:?} matches no field of {}",
                            shape.type_identifier
                        ),
                    }
                    None
                }
            })
            .collect()
    }
}

struct Target {
    shape: std::sync::Arc<Shape>,
    path: Vec<usize>,
}
