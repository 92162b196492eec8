//! Time-axis unification.
//!
//! # Strategy
//!
//! Single time column:
//!
//! 1. Parse every cell as calendar time; accept if the success rate meets
//!    the threshold.
//! 2. Otherwise, if every non-empty cell is numeric, use the number itself as
//!    an ordinal key (again subject to the threshold).
//!
//! Several time columns:
//!
//! 1. Join the display forms with the separator and parse the result as
//!    calendar time; accept if the success rate meets the threshold.
//! 2. Otherwise, if every column is numeric, concatenate the display forms
//!    without a separator and parse the result as a number, giving a
//!    composite ordinal key (`2023`, `1` → `20231`).
//!
//! If no strategy meets the threshold the request fails with the best rate
//! achieved. Rows whose key could not be built are dropped and counted.

use tracing::debug;

use super::{parse_calendar, parse_calendar_str, TimeKey, TimeKind};
use crate::error::AnalysisError;
use crate::table::{Row, Table};

/// Default fraction of rows that must yield a key.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.70;

/// How the key was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnifyStrategy {
    /// One column parsed as calendar time.
    Calendar,
    /// One purely numeric column used as-is.
    Ordinal,
    /// Several columns joined and parsed as calendar time.
    CombinedCalendar,
    /// Several numeric columns concatenated into one number.
    CompositeOrdinal,
}

impl UnifyStrategy {
    /// Kind of key this strategy produces.
    pub fn kind(self) -> TimeKind {
        match self {
            UnifyStrategy::Calendar | UnifyStrategy::CombinedCalendar => TimeKind::Calendar,
            UnifyStrategy::Ordinal | UnifyStrategy::CompositeOrdinal => TimeKind::Ordinal,
        }
    }
}

/// A source row paired with its unified key.
#[derive(Debug, Clone, Copy)]
pub struct TimedRow<'a> {
    pub row: &'a Row,
    pub key: TimeKey,
}

/// Result of unification over a row set.
#[derive(Debug, Clone)]
pub struct TimeAxis<'a> {
    pub strategy: UnifyStrategy,
    /// Rows that received a key, in input order.
    pub rows: Vec<TimedRow<'a>>,
    /// Rows dropped because no key could be built.
    pub dropped: usize,
    /// Fraction of input rows that received a key.
    pub success_rate: f64,
}

impl TimeAxis<'_> {
    /// Kind of every key on this axis.
    pub fn kind(&self) -> TimeKind {
        self.strategy.kind()
    }
}

/// Builds a [`TimeAxis`] from one or more time columns.
///
/// # Examples
///
/// ```
/// use u_spc_trace::table::Table;
/// use u_spc_trace::timeaxis::{TimeKey, Unifier, UnifyStrategy};
///
/// let table = Table::from_rows(
///     vec!["Year".into(), "Month".into()],
///     vec![vec![2023.into(), 1.into()], vec![2023.into(), 2.into()]],
/// ).unwrap();
/// let rows: Vec<_> = table.rows().iter().collect();
///
/// let axis = Unifier::default()
///     .unify(&table, &rows, &["Year".to_string(), "Month".to_string()])
///     .unwrap();
/// assert_eq!(axis.strategy, UnifyStrategy::CompositeOrdinal);
/// assert_eq!(axis.rows[0].key, TimeKey::Ordinal(20231.0));
/// assert_eq!(axis.rows[1].key, TimeKey::Ordinal(20232.0));
/// ```
#[derive(Debug, Clone)]
pub struct Unifier {
    threshold: f64,
    separator: String,
}

impl Default for Unifier {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SUCCESS_THRESHOLD,
            separator: " ".to_string(),
        }
    }
}

impl Unifier {
    /// Creates a unifier with the given success threshold in `(0, 1]`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Sets the separator used when joining several columns for calendar parsing.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// The configured success threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Unifies `columns` of `rows` into one key per row.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::InvalidParameter`] if `columns` is empty.
    /// - [`AnalysisError::MissingColumn`] if a column does not exist.
    /// - [`AnalysisError::InputEmpty`] if `rows` is empty.
    /// - [`AnalysisError::TimeUnification`] if no strategy meets the threshold.
    pub fn unify<'a>(
        &self,
        table: &Table,
        rows: &[&'a Row],
        columns: &[String],
    ) -> Result<TimeAxis<'a>, AnalysisError> {
        if columns.is_empty() {
            return Err(AnalysisError::InvalidParameter {
                name: "time_columns",
                reason: "at least one time column is required".to_string(),
            });
        }
        let idx = columns
            .iter()
            .map(|c| {
                table
                    .column_index(c)
                    .ok_or_else(|| AnalysisError::MissingColumn(c.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if rows.is_empty() {
            return Err(AnalysisError::InputEmpty {
                stage: "time unification",
            });
        }

        let (calendar_strategy, calendar): (UnifyStrategy, Vec<Option<TimeKey>>) =
            if let [col] = idx.as_slice() {
                let keys = rows
                    .iter()
                    .map(|r| parse_calendar(r.get(*col)).map(TimeKey::Calendar))
                    .collect();
                (UnifyStrategy::Calendar, keys)
            } else {
                let keys = rows
                    .iter()
                    .map(|r| {
                        joined_fields(r, &idx, &self.separator)
                            .and_then(|s| parse_calendar_str(&s))
                            .map(TimeKey::Calendar)
                    })
                    .collect();
                (UnifyStrategy::CombinedCalendar, keys)
            };

        let calendar_rate = success_rate(&calendar);
        if calendar_rate >= self.threshold {
            debug!(
                columns = ?columns,
                rate = calendar_rate,
                "time axis unified as calendar"
            );
            return Ok(build_axis(rows, calendar, calendar_strategy, calendar_rate));
        }

        let purely_numeric = idx.iter().all(|&c| {
            rows.iter().all(|r| {
                let cell = r.get(c);
                cell.is_null() || cell.is_numeric()
            })
        });

        let (ordinal_strategy, ordinal): (UnifyStrategy, Vec<Option<TimeKey>>) =
            if let [col] = idx.as_slice() {
                let keys = rows
                    .iter()
                    .map(|r| r.get(*col).as_f64().map(TimeKey::Ordinal))
                    .collect();
                (UnifyStrategy::Ordinal, keys)
            } else {
                let keys = rows
                    .iter()
                    .map(|r| {
                        joined_fields(r, &idx, "")
                            .and_then(|s| s.parse::<f64>().ok())
                            .filter(|v| v.is_finite())
                            .map(TimeKey::Ordinal)
                    })
                    .collect();
                (UnifyStrategy::CompositeOrdinal, keys)
            };

        let ordinal_rate = success_rate(&ordinal);
        if purely_numeric && ordinal_rate >= self.threshold {
            debug!(
                columns = ?columns,
                rate = ordinal_rate,
                "time axis unified as ordinal"
            );
            return Ok(build_axis(rows, ordinal, ordinal_strategy, ordinal_rate));
        }

        let best = if purely_numeric {
            calendar_rate.max(ordinal_rate)
        } else {
            calendar_rate
        };
        Err(AnalysisError::TimeUnification {
            columns: columns.to_vec(),
            success_rate: best,
            threshold: self.threshold,
        })
    }
}

/// Display forms of `idx` joined by `sep`, or `None` if any field is empty.
fn joined_fields(row: &Row, idx: &[usize], sep: &str) -> Option<String> {
    let parts = idx
        .iter()
        .map(|&c| {
            let cell = row.get(c);
            (!cell.is_null()).then(|| cell.display())
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(sep))
}

fn success_rate(keys: &[Option<TimeKey>]) -> f64 {
    if keys.is_empty() {
        return 0.0;
    }
    keys.iter().filter(|k| k.is_some()).count() as f64 / keys.len() as f64
}

fn build_axis<'a>(
    rows: &[&'a Row],
    keys: Vec<Option<TimeKey>>,
    strategy: UnifyStrategy,
    success_rate: f64,
) -> TimeAxis<'a> {
    let timed: Vec<TimedRow<'a>> = rows
        .iter()
        .zip(keys)
        .filter_map(|(row, key)| key.map(|key| TimedRow { row: *row, key }))
        .collect();
    TimeAxis {
        strategy,
        dropped: rows.len() - timed.len(),
        rows: timed,
        success_rate,
    }
}
