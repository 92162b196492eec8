//! Column classification for presenting analysis choices.
//!
//! Flags each column as numeric, date-like, or low-cardinality categorical.
//! The engine does not consume this; it is offered to callers so they can
//! pick value, time, cut, and filter columns.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Table;
use crate::timeaxis::parse_calendar;

/// Rows inspected for date detection.
const DATE_SAMPLE_ROWS: usize = 100;

/// Fraction of sampled cells that must parse as calendar time.
const DATE_LIKE_RATIO: f64 = 0.5;

/// Categorical columns with this many distinct values or more get no filter options.
const MAX_FILTER_CARDINALITY: usize = 50;

/// Classification of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Every non-empty cell is numeric (and at least one exists).
    pub is_numeric: bool,
    /// More than half of the sampled rows parse as calendar time.
    pub is_date_like: bool,
    /// Number of distinct non-empty display values.
    pub distinct: usize,
}

/// Column classifications plus filter choices for categorical columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub columns: Vec<ColumnInfo>,
    /// Sorted distinct values for each low-cardinality categorical column.
    pub filter_options: BTreeMap<String, Vec<String>>,
}

/// Classifies every column of `table`.
///
/// # Examples
///
/// ```
/// use u_spc_trace::table::{classify_columns, Table};
///
/// let table = Table::from_rows(
///     vec!["day".into(), "units".into(), "line".into()],
///     vec![
///         vec!["2024-01-01".into(), 5.into(), "L1".into()],
///         vec!["2024-01-02".into(), 7.into(), "L2".into()],
///     ],
/// ).unwrap();
///
/// let summary = classify_columns(&table);
/// assert!(summary.columns[0].is_date_like);
/// assert!(summary.columns[1].is_numeric);
/// assert_eq!(summary.filter_options["line"], vec!["L1", "L2"]);
/// ```
pub fn classify_columns(table: &Table) -> ColumnSummary {
    let sample_len = table.len().min(DATE_SAMPLE_ROWS);
    let mut summary = ColumnSummary::default();

    for (idx, name) in table.columns().iter().enumerate() {
        let mut non_null = 0usize;
        let mut numeric = 0usize;
        let mut distinct = BTreeSet::new();
        for row in table.rows() {
            let cell = row.get(idx);
            if cell.is_null() {
                continue;
            }
            non_null += 1;
            if cell.is_numeric() {
                numeric += 1;
            }
            distinct.insert(cell.display());
        }

        let is_numeric = non_null > 0 && numeric == non_null;
        let is_date_like = sample_len > 0 && {
            let parsed = table.rows()[..sample_len]
                .iter()
                .filter(|row| parse_calendar(row.get(idx)).is_some())
                .count();
            parsed as f64 / sample_len as f64 > DATE_LIKE_RATIO
        };

        if !is_numeric
            && !is_date_like
            && distinct.len() > 1
            && distinct.len() < MAX_FILTER_CARDINALITY
        {
            summary
                .filter_options
                .insert(name.clone(), distinct.iter().cloned().collect());
        }

        summary.columns.push(ColumnInfo {
            name: name.clone(),
            is_numeric,
            is_date_like,
            distinct: distinct.len(),
        });
    }

    summary
}
