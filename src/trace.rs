//! Traceability from flagged periods back to source rows.
//!
//! The source table is filtered and unified again with the settings recorded
//! on the results ([`AxisSettings`]), candidates are restricted to rows with
//! a numeric value in the flagged period's own group, and the aggregation
//! mode decides which rows belong to the period:
//!
//! | Mode | Match |
//! |---|---|
//! | ordinal key (any mode) | same key |
//! | none | same key and same value |
//! | daily | same calendar day |
//! | weekly | same Monday-Sunday week |
//! | monthly | same year and month |
//! | yearly | same year |
//! | unrecognized | within ± `fallback_window_days` |
//!
//! The result is a set, so repeated runs over the same inputs are identical.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, TimeDelta};
use tracing::{debug, warn};

use crate::aggregate::AggregationMode;
use crate::config::AnalysisConfig;
use crate::engine::{AxisSettings, GroupResult};
use crate::error::AnalysisError;
use crate::spc::Period;
use crate::table::{Filters, Row, RowId, Table};
use crate::timeaxis::{TimeAxis, TimeKey, Unifier};

/// A filtered, unified source row with a numeric value.
struct Candidate<'a> {
    row: &'a Row,
    key: TimeKey,
    value: f64,
}

/// Maps flagged periods to source rows with given time-axis settings.
#[derive(Debug, Clone)]
pub struct Tracer {
    success_threshold: f64,
    time_separator: String,
    fallback_window_days: u32,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl Tracer {
    /// Tracer using the time-axis settings of `config`.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            success_threshold: config.success_threshold,
            time_separator: config.time_separator.clone(),
            fallback_window_days: config.fallback_window_days,
        }
    }

    /// Tracer using the settings recorded on `results`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidParameter`] if the results were produced with
    /// different time-axis settings.
    pub fn for_results(results: &[GroupResult]) -> Result<Self, AnalysisError> {
        let Some(first) = results.first() else {
            return Ok(Self::default());
        };
        let tracer = Self {
            success_threshold: first.axis.success_threshold,
            time_separator: first.axis.time_separator.clone(),
            fallback_window_days: first.axis.fallback_window_days,
        };
        if let Some(other) = results.iter().find(|r| r.axis != first.axis) {
            return Err(AnalysisError::InvalidParameter {
                name: "results",
                reason: format!(
                    "'{}' and '{}' were analyzed with different time-axis settings",
                    first.name, other.name
                ),
            });
        }
        Ok(tracer)
    }

    /// Row identifiers behind every flagged period of every result.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::MissingColumn`] for an unknown value or time column.
    /// - [`AnalysisError::TimeUnification`] if the time axis cannot be rebuilt.
    /// - [`AnalysisError::InvalidParameter`] if a result was produced with
    ///   other settings than this tracer's, or the rebuilt axis uses another
    ///   strategy than the analysis did.
    ///
    /// An empty filter result yields an empty set.
    pub fn trace(
        &self,
        table: &Table,
        value_column: &str,
        time_columns: &[String],
        results: &[GroupResult],
        filters: &Filters,
    ) -> Result<BTreeSet<RowId>, AnalysisError> {
        let value_idx = table
            .column_index(value_column)
            .ok_or_else(|| AnalysisError::MissingColumn(value_column.to_string()))?;
        if let Some(r) = results.iter().find(|r| !self.accepts(&r.axis)) {
            return Err(AnalysisError::InvalidParameter {
                name: "results",
                reason: format!("'{}' was analyzed with other time-axis settings", r.name),
            });
        }
        let filtered = table.filtered(filters);
        if filtered.is_empty() {
            return Ok(BTreeSet::new());
        }

        let axis = Unifier::new(self.success_threshold)
            .with_separator(self.time_separator.clone())
            .unify(table, &filtered, time_columns)?;
        check_strategy(&axis, results)?;

        let candidates: Vec<Candidate<'_>> = axis
            .rows
            .iter()
            .filter_map(|t| {
                t.row.get(value_idx).as_f64().map(|value| Candidate {
                    row: t.row,
                    key: t.key,
                    value,
                })
            })
            .collect();

        let mut matched = BTreeSet::new();
        for result in results {
            let Some(in_group) = group_filter(table, result) else {
                debug!(group = %result.name, "group column missing; nothing to trace");
                continue;
            };
            let members: Vec<&Candidate<'_>> = candidates
                .iter()
                .filter(|c| {
                    in_group
                        .iter()
                        .all(|(idx, val)| c.row.get(*idx).display() == *val)
                })
                .collect();

            let before = matched.len();
            for period in result.outlier_periods() {
                matched.extend(
                    members
                        .iter()
                        .filter(|c| self.belongs(c, period, result.aggregation))
                        .map(|c| c.row.id()),
                );
            }
            debug!(
                group = %result.name,
                rows = matched.len() - before,
                "outlier rows traced"
            );
        }
        Ok(matched)
    }

    fn accepts(&self, axis: &AxisSettings) -> bool {
        axis.success_threshold == self.success_threshold
            && axis.time_separator == self.time_separator
            && axis.fallback_window_days == self.fallback_window_days
    }

    fn belongs(&self, c: &Candidate<'_>, period: &Period, mode: AggregationMode) -> bool {
        let (TimeKey::Calendar(row_dt), TimeKey::Calendar(period_dt)) = (c.key, period.time)
        else {
            return c.key == period.time;
        };
        let (row_date, period_date) = (row_dt.date(), period_dt.date());
        match mode {
            AggregationMode::None => c.key == period.time && c.value == period.value,
            AggregationMode::Daily => row_date == period_date,
            AggregationMode::Weekly => {
                iso_week_bounds(period_date).is_some_and(|(mon, sun)| (mon..=sun).contains(&row_date))
            }
            AggregationMode::Monthly => {
                (row_date.year(), row_date.month()) == (period_date.year(), period_date.month())
            }
            AggregationMode::Yearly => row_date.year() == period_date.year(),
            AggregationMode::Unrecognized => {
                within_days(row_dt, period_dt, self.fallback_window_days)
            }
        }
    }
}

/// Row identifiers behind every flagged period.
///
/// The time axis is rebuilt with the settings recorded on `results`.
/// Failures are logged and yield an empty set.
///
/// # Examples
///
/// ```
/// use u_spc_trace::aggregate::AggregationMode;
/// use u_spc_trace::engine::{analyze, AnalysisRequest};
/// use u_spc_trace::table::{Filters, RowId, Table};
/// use u_spc_trace::trace::map_outliers_to_rows;
///
/// let table = Table::from_rows(
///     vec!["w".into(), "v".into()],
///     vec![
///         vec![1.into(), 10.into()],
///         vec![2.into(), 12.into()],
///         vec![3.into(), 11.into()],
///         vec![4.into(), 100.into()],
///     ],
/// ).unwrap();
/// let request = AnalysisRequest::new("v", ["w"])
///     .with_aggregation(AggregationMode::None)
///     .with_rolling_window(3);
/// let (results, _) = analyze(&table, &request);
///
/// let rows = map_outliers_to_rows(&table, "v", &["w".to_string()], &results, &Filters::new());
/// assert_eq!(rows.into_iter().collect::<Vec<_>>(), vec![RowId(3)]);
/// ```
pub fn map_outliers_to_rows(
    table: &Table,
    value_column: &str,
    time_columns: &[String],
    results: &[GroupResult],
    filters: &Filters,
) -> BTreeSet<RowId> {
    Tracer::for_results(results)
        .and_then(|tracer| tracer.trace(table, value_column, time_columns, results, filters))
        .unwrap_or_else(|err| {
            warn!(error = %err, "outlier tracing failed");
            BTreeSet::new()
        })
}

/// Fails if the rebuilt axis was built another way than a result's.
fn check_strategy(axis: &TimeAxis<'_>, results: &[GroupResult]) -> Result<(), AnalysisError> {
    match results.iter().find(|r| r.axis.strategy != axis.strategy) {
        Some(r) => Err(AnalysisError::InvalidParameter {
            name: "time_columns",
            reason: format!(
                "time axis rebuilt as {:?}, '{}' was analyzed as {:?}",
                axis.strategy, r.name, r.axis.strategy
            ),
        }),
        None => Ok(()),
    }
}

/// Column indices and display values of a result's group key.
fn group_filter(table: &Table, result: &GroupResult) -> Option<Vec<(usize, String)>> {
    result
        .key
        .iter()
        .map(|(col, val)| table.column_index(col).map(|idx| (idx, val.clone())))
        .collect()
}

/// Monday and Sunday of the week containing `date`.
fn iso_week_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let monday =
        date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))?;
    let sunday = monday.checked_add_days(Days::new(6))?;
    Some((monday, sunday))
}

fn within_days(a: NaiveDateTime, b: NaiveDateTime, days: u32) -> bool {
    (a - b).abs() <= TimeDelta::days(i64::from(days))
}
