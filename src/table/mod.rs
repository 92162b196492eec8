//! In-memory tabular input.
//!
//! A [`Table`] is the rectangular, already-loaded dataset an analysis runs
//! over. Each [`Row`] keeps the stable positional [`RowId`] it was loaded
//! with, which is what the traceability mapper reports back.
//!
//! # Examples
//!
//! ```
//! use u_spc_trace::table::{CellValue, Filters, Table};
//!
//! let mut table = Table::new(vec!["week".into(), "count".into(), "site".into()]).unwrap();
//! table.push_row(vec![1.into(), 10.into(), "A".into()]).unwrap();
//! table.push_row(vec![2.into(), 12.into(), "B".into()]).unwrap();
//!
//! let filters = Filters::new().with("site", ["A"]);
//! let rows = table.filtered(&filters);
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get(1), &CellValue::Int(10));
//! ```

mod classify;
mod value;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::TableError;

pub use classify::{classify_columns, ColumnInfo, ColumnSummary};
pub use value::CellValue;

static NULL_CELL: CellValue = CellValue::Null;

/// Stable positional identifier of a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub usize);

/// One source row: its identifier and one cell per table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    cells: Vec<CellValue>,
}

impl Row {
    /// The row's stable identifier.
    pub fn id(&self) -> RowId {
        self.id
    }

    /// All cells in column order.
    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    /// Cell at column index `col`, or `Null` when out of range.
    pub fn get(&self, col: usize) -> &CellValue {
        self.cells.get(col).unwrap_or(&NULL_CELL)
    }
}

/// A rectangular table with named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with the given column names.
    ///
    /// Column names must be unique.
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Builds a table from rows, assigning positional identifiers `0..n`.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, TableError> {
        let mut table = Self::new(columns)?;
        for cells in rows {
            table.push_row(cells)?;
        }
        Ok(table)
    }

    /// Appends a row whose identifier is its position in the table.
    pub fn push_row(&mut self, cells: Vec<CellValue>) -> Result<RowId, TableError> {
        let id = RowId(self.rows.len());
        self.push_row_with_id(id, cells)?;
        Ok(id)
    }

    /// Appends a row with an identifier chosen by the loader.
    ///
    /// Used when the loader already dropped blank rows and wants to keep the
    /// original file positions.
    pub fn push_row_with_id(&mut self, id: RowId, cells: Vec<CellValue>) -> Result<(), TableError> {
        if cells.len() != self.columns.len() {
            return Err(TableError::RaggedRow {
                row: id.0,
                found: cells.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(Row { id, cells });
        Ok(())
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in load order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns true if the named column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Rows passing every applicable filter, in load order.
    pub fn filtered(&self, filters: &Filters) -> Vec<&Row> {
        let active: Vec<(usize, &Vec<String>)> = filters
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .filter_map(|(col, values)| self.column_index(col).map(|idx| (idx, values)))
            .collect();

        self.rows
            .iter()
            .filter(|row| {
                active.iter().all(|(idx, allowed)| {
                    let shown = row.get(*idx).display();
                    allowed.iter().any(|a| a == &shown)
                })
            })
            .collect()
    }
}

/// Column → allowed display values.
///
/// A row passes when, for every filter naming an existing column with a
/// non-empty value list, the cell's display form is one of the values.
/// Filters on unknown columns or with empty lists are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, Vec<String>>);

impl Filters {
    /// Empty filter set (every row passes).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the allowed values for `column`.
    pub fn with<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(column.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true if no filter is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(column, allowed values)`.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Vec<String>>> for Filters {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}
