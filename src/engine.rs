//! Analysis orchestration.
//!
//! ```text
//! table ─ filter ─ unify time ─ clean values ─ segment
//!                                                 │
//!                          per group: aggregate ─ estimate limits ─ classify
//!                                                 │
//!                                         GroupResult | SkipReason
//! ```
//!
//! Request-level problems (missing columns, invalid parameters, no rows, a
//! time axis that cannot be built) stop the whole request. A group that
//! cannot be charted is skipped with a [`SkipReason`] and never affects its
//! siblings.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, AggregationMode};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, SkipReason};
use crate::segment::{group_name, segment, Group, Observation};
use crate::spc::{estimate_limits, Classifier, Period, SigmaMethod, TierCounts};
use crate::table::{Filters, Table};
use crate::timeaxis::{TimeKind, Unifier, UnifyStrategy};

/// Stage name reported when filtering leaves no rows.
pub const STAGE_FILTER: &str = "filtering";
/// Stage name reported when value cleaning leaves no rows.
pub const STAGE_CLEAN: &str = "cleaning";

/// Parameters of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Column holding the measured quantity.
    pub value_column: String,
    /// One or more columns forming the time axis, in order.
    pub time_columns: Vec<String>,
    /// Candidate categorical columns to segment by.
    #[serde(default)]
    pub cut_columns: Vec<String>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub config: AnalysisConfig,
}

impl AnalysisRequest {
    /// Request with default configuration, no cuts and no filters.
    pub fn new<I, S>(value_column: impl Into<String>, time_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value_column: value_column.into(),
            time_columns: time_columns.into_iter().map(Into::into).collect(),
            cut_columns: Vec::new(),
            filters: Filters::default(),
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_cut_columns<I, S>(mut self, cut_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cut_columns = cut_columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_aggregation(mut self, mode: AggregationMode) -> Self {
        self.config.aggregation = mode;
        self
    }

    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.config.rolling_window = window;
        self
    }

    pub fn with_limit_multiplier(mut self, k: f64) -> Self {
        self.config.limit_multiplier = k;
        self
    }

    /// Checks columns and parameters against `table`.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::MissingColumn`] for an unknown value or time column.
    /// - [`AnalysisError::InvalidParameter`] for an empty time column list or
    ///   an invalid configuration.
    pub fn validate(&self, table: &Table) -> Result<(), AnalysisError> {
        if !table.has_column(&self.value_column) {
            return Err(AnalysisError::MissingColumn(self.value_column.clone()));
        }
        if self.time_columns.is_empty() {
            return Err(AnalysisError::InvalidParameter {
                name: "time_columns",
                reason: "at least one time column is required".to_string(),
            });
        }
        if let Some(missing) = self.time_columns.iter().find(|c| !table.has_column(c)) {
            return Err(AnalysisError::MissingColumn(missing.clone()));
        }
        self.config.validate()?;
        Ok(())
    }

    pub(crate) fn unifier(&self) -> Unifier {
        Unifier::new(self.config.success_threshold)
            .with_separator(self.config.time_separator.clone())
    }
}

/// Mean, sample standard deviation and extremes of a group's period values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl DescriptiveStats {
    /// Returns `None` for fewer than two values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        Some(Self {
            mean: values.iter().mean(),
            std_dev: values.iter().std_dev(),
            min: Statistics::min(values.iter()),
            max: Statistics::max(values.iter()),
        })
    }
}

/// Lowest and highest point a chart has to show, over values and limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    fn of(periods: &[Period]) -> Self {
        periods.iter().fold(
            Self {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |r, p| Self {
                min: r.min.min(p.value).min(p.limits.lcl),
                max: r.max.max(p.value).max(p.limits.ucl),
            },
        )
    }
}

/// Time-axis settings a result was produced with.
///
/// Tracing rebuilds the time axis from these, so flagged periods resolve to
/// the same keys the analysis saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSettings {
    /// Strategy the unifier settled on.
    pub strategy: UnifyStrategy,
    pub success_threshold: f64,
    pub time_separator: String,
    /// Half-width of the fallback tracing window.
    pub fallback_window_days: u32,
}

impl AxisSettings {
    pub fn new(config: &AnalysisConfig, strategy: UnifyStrategy) -> Self {
        Self {
            strategy,
            success_threshold: config.success_threshold,
            time_separator: config.time_separator.clone(),
            fallback_window_days: config.fallback_window_days,
        }
    }
}

/// One group's complete chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResult {
    /// `(column, value)` pairs of the group; empty when ungrouped.
    pub key: Vec<(String, String)>,
    /// `All Data` or `col=val, col=val`.
    pub name: String,
    pub title: String,
    pub value_column: String,
    /// Mode requested for this chart.
    pub aggregation: AggregationMode,
    pub time_kind: TimeKind,
    pub axis: AxisSettings,
    /// Periods in time order.
    pub periods: Vec<Period>,
    pub stats: DescriptiveStats,
    pub range: ValueRange,
    pub counts: TierCounts,
    pub sigma: f64,
    pub sigma_method: SigmaMethod,
    pub rolling_window: usize,
    pub limit_multiplier: f64,
}

impl GroupResult {
    /// Number of periods on the chart.
    pub fn data_points(&self) -> usize {
        self.periods.len()
    }

    /// Periods flagged high or low.
    pub fn outlier_periods(&self) -> impl Iterator<Item = &Period> {
        self.periods.iter().filter(|p| p.is_outlier())
    }
}

/// A group and what became of it.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub key: Vec<(String, String)>,
    pub name: String,
    pub result: Result<GroupResult, SkipReason>,
}

/// A group that produced no chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub name: String,
    pub reason: SkipReason,
}

/// Full outcome of [`analyze_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Rows in the table.
    pub initial_rows: usize,
    /// Rows passing the filters.
    pub rows_after_filter: usize,
    /// Filtered rows without a time key or a numeric value.
    pub rows_dropped: usize,
    /// Clean rows with an empty cut-column value.
    pub rows_unassigned: usize,
    pub strategy: UnifyStrategy,
    /// Cut columns actually used.
    pub cut_columns: Vec<String>,
    /// Every group in key order, charted or skipped.
    pub groups: Vec<GroupOutcome>,
}

/// Row counts and a human-readable outcome of one request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusReport {
    pub initial_rows: usize,
    pub rows_after_filter: usize,
    pub rows_dropped: usize,
    pub groups_analyzed: usize,
    pub skipped: Vec<SkippedGroup>,
    pub outcome: String,
    /// Request-level failure, if any.
    #[serde(skip)]
    pub error: Option<AnalysisError>,
}

impl StatusReport {
    /// Returns true if the request produced no request-level failure.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the pipeline and reports every group.
///
/// # Errors
///
/// - Validation errors from [`AnalysisRequest::validate`].
/// - [`AnalysisError::InputEmpty`] when filtering ([`STAGE_FILTER`]) or
///   cleaning ([`STAGE_CLEAN`]) leaves no rows.
/// - [`AnalysisError::TimeUnification`] when no time strategy meets the
///   success threshold.
pub fn analyze_detailed(table: &Table, request: &AnalysisRequest) -> Result<Analysis, AnalysisError> {
    request.validate(table)?;
    let config = &request.config;
    info!(
        value_column = %request.value_column,
        time_columns = ?request.time_columns,
        cut_columns = ?request.cut_columns,
        aggregation = config.aggregation.code(),
        rows = table.len(),
        "analysis started"
    );

    let filtered = table.filtered(&request.filters);
    if filtered.is_empty() {
        return Err(AnalysisError::InputEmpty {
            stage: STAGE_FILTER,
        });
    }

    let axis = request
        .unifier()
        .unify(table, &filtered, &request.time_columns)?;
    let value_idx = table
        .column_index(&request.value_column)
        .ok_or_else(|| AnalysisError::MissingColumn(request.value_column.clone()))?;

    let observations: Vec<Observation<'_>> = axis
        .rows
        .iter()
        .filter_map(|t| {
            t.row.get(value_idx).as_f64().map(|value| Observation {
                row: t.row,
                key: t.key,
                value,
            })
        })
        .collect();
    let rows_dropped = filtered.len() - observations.len();
    debug!(
        strategy = ?axis.strategy,
        unify_dropped = axis.dropped,
        rows_dropped,
        "rows cleaned"
    );
    if observations.is_empty() {
        return Err(AnalysisError::InputEmpty { stage: STAGE_CLEAN });
    }

    let seg = segment(table, observations, &request.cut_columns);
    let classifier = Classifier::new(config.severe_factor, config.recent_fraction).ok_or_else(
        || AnalysisError::InvalidParameter {
            name: "classifier",
            reason: "invalid severe factor or recent fraction".to_string(),
        },
    )?;

    let mut groups: Vec<GroupOutcome> = seg
        .groups
        .iter()
        .chain(seg.undersized.iter())
        .map(|group| {
            let result = chart_group(group, request, &classifier, axis.strategy);
            if let Err(reason) = &result {
                warn!(group = %group.name(), %reason, "group skipped");
            }
            GroupOutcome {
                key: group.key.clone(),
                name: group.name(),
                result,
            }
        })
        .collect();
    groups.sort_by(|a, b| a.key.cmp(&b.key));

    let analysis = Analysis {
        initial_rows: table.len(),
        rows_after_filter: filtered.len(),
        rows_dropped,
        rows_unassigned: seg.unassigned,
        strategy: axis.strategy,
        cut_columns: seg.cut_columns,
        groups,
    };
    info!(
        charts = analysis.groups.iter().filter(|g| g.result.is_ok()).count(),
        skipped = analysis.groups.iter().filter(|g| g.result.is_err()).count(),
        rows_dropped,
        "analysis finished"
    );
    Ok(analysis)
}

/// Runs the pipeline and returns the charted groups with a status report.
///
/// Never fails: request-level errors yield no results and a report that
/// explains why.
///
/// # Examples
///
/// ```
/// use u_spc_trace::aggregate::AggregationMode;
/// use u_spc_trace::engine::{analyze, AnalysisRequest};
/// use u_spc_trace::table::Table;
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
///     .with_rolling_window(3)
///     .with_limit_multiplier(2.0);
///
/// let (results, status) = analyze(&table, &request);
/// assert_eq!(results.len(), 1);
/// assert!(results[0].periods[3].flags.high);
/// assert!(status.outcome.starts_with("Analysis complete."));
/// ```
pub fn analyze(table: &Table, request: &AnalysisRequest) -> (Vec<GroupResult>, StatusReport) {
    match analyze_detailed(table, request) {
        Ok(analysis) => {
            let mut results = Vec::new();
            let mut skipped = Vec::new();
            for g in analysis.groups {
                match g.result {
                    Ok(r) => results.push(r),
                    Err(reason) => skipped.push(SkippedGroup {
                        name: g.name,
                        reason,
                    }),
                }
            }
            let mut outcome = format!(
                "Analysis complete. {} rows excluded. Generated {} charts.",
                analysis.rows_dropped,
                results.len()
            );
            if !skipped.is_empty() {
                outcome.push_str(&format!(" Skipped {} group(s).", skipped.len()));
            }
            let status = StatusReport {
                initial_rows: analysis.initial_rows,
                rows_after_filter: analysis.rows_after_filter,
                rows_dropped: analysis.rows_dropped,
                groups_analyzed: results.len(),
                skipped,
                outcome,
                error: None,
            };
            (results, status)
        }
        Err(err) => {
            warn!(error = %err, "analysis failed");
            (Vec::new(), failure_report(table, request, err))
        }
    }
}

fn failure_report(table: &Table, request: &AnalysisRequest, err: AnalysisError) -> StatusReport {
    let mut status = StatusReport {
        initial_rows: table.len(),
        ..StatusReport::default()
    };
    status.outcome = match &err {
        AnalysisError::InputEmpty {
            stage: STAGE_FILTER,
        } => "No data remaining after applying filters.".to_string(),
        AnalysisError::InputEmpty { stage: STAGE_CLEAN } => {
            let after_filter = table.filtered(&request.filters).len();
            status.rows_after_filter = after_filter;
            status.rows_dropped = after_filter;
            format!("{after_filter} rows dropped; no data remains.")
        }
        other => other.to_string(),
    };
    status.error = Some(err);
    status
}

/// Aggregates, estimates and classifies one group.
fn chart_group(
    group: &Group<'_>,
    request: &AnalysisRequest,
    classifier: &Classifier,
    strategy: UnifyStrategy,
) -> Result<GroupResult, SkipReason> {
    if group.len() < 2 {
        return Err(SkipReason::InsufficientRows { rows: group.len() });
    }
    let config = &request.config;
    let buckets = aggregate(group.observations.clone(), config.aggregation)?;
    let values: Vec<f64> = buckets.iter().map(|b| b.value).collect();

    let estimate = estimate_limits(&values, config.rolling_window, config.limit_multiplier)?;
    let flags = classifier.classify(&values, &estimate.limits);

    let periods: Vec<Period> = buckets
        .into_iter()
        .zip(estimate.limits.iter().copied())
        .zip(flags)
        .enumerate()
        .map(|(index, ((bucket, limits), flags))| Period {
            index,
            time: bucket.time,
            value: bucket.value,
            limits,
            flags,
            rows: bucket.members.iter().map(|o| o.row.id()).collect(),
        })
        .collect();

    let stats = DescriptiveStats::from_values(&values)
        .ok_or(SkipReason::InsufficientPeriods { periods: values.len() })?;
    let name = group_name(&group.key);
    let title = if group.key.is_empty() {
        format!("Chart for {}", request.value_column)
    } else {
        format!("Chart for {} - {}", request.value_column, name)
    };

    Ok(GroupResult {
        key: group.key.clone(),
        name,
        title,
        value_column: request.value_column.clone(),
        aggregation: config.aggregation,
        time_kind: strategy.kind(),
        axis: AxisSettings::new(config, strategy),
        range: ValueRange::of(&periods),
        counts: TierCounts::from_flags(periods.iter().map(|p| &p.flags)),
        periods,
        stats,
        sigma: estimate.sigma,
        sigma_method: estimate.method,
        rolling_window: config.rolling_window,
        limit_multiplier: config.limit_multiplier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, RowId};
    use crate::timeaxis::TimeKey;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn weekly_codes(values: &[f64]) -> Table {
        Table::from_rows(
            vec!["w".into(), "v".into()],
            values
                .iter()
                .enumerate()
                .map(|(i, v)| vec![CellValue::Int(i as i64 + 1), CellValue::Float(*v)])
                .collect(),
        )
        .unwrap()
    }

    fn raw_request() -> AnalysisRequest {
        AnalysisRequest::new("v", ["w"])
            .with_aggregation(AggregationMode::None)
            .with_rolling_window(3)
            .with_limit_multiplier(2.0)
    }

    #[test]
    fn test_spike_flagged_high() {
        init_tracing();
        let table = weekly_codes(&[10.0, 12.0, 11.0, 100.0]);
        let (results, status) = analyze(&table, &raw_request());
        assert!(status.is_ok(), "{}", status.outcome);
        assert_eq!(results.len(), 1);

        let r = &results[0];
        assert_eq!(r.name, "All Data");
        assert_eq!(r.title, "Chart for v");
        assert_eq!(r.time_kind, TimeKind::Ordinal);
        assert_eq!(r.axis, AxisSettings::new(&AnalysisConfig::default(), UnifyStrategy::Ordinal));
        assert_eq!(r.data_points(), 4);
        let last = &r.periods[3];
        assert!(last.flags.high);
        assert!(last.flags.recent);
        assert_eq!(last.rows, vec![RowId(3)]);
        assert_eq!(last.time, TimeKey::Ordinal(4.0));
        assert!(r.periods[..3].iter().all(|p| !p.is_outlier()));
        assert_eq!(r.counts.high, 1);
        assert_eq!(r.counts.recent, 1);
        assert_eq!(
            status.outcome,
            "Analysis complete. 0 rows excluded. Generated 1 charts."
        );
    }

    #[test]
    fn test_constant_values_degenerate() {
        init_tracing();
        let table = weekly_codes(&[5.0, 5.0, 5.0, 5.0, 5.0]);
        let request = raw_request();
        let analysis = analyze_detailed(&table, &request).unwrap();
        assert_eq!(analysis.groups.len(), 1);
        assert!(matches!(
            analysis.groups[0].result,
            Err(SkipReason::DegenerateVariation { .. })
        ));

        let (results, status) = analyze(&table, &request);
        assert!(results.is_empty());
        assert_eq!(status.skipped.len(), 1);
        assert!(status.outcome.contains("Generated 0 charts"));
        assert!(status.outcome.contains("Skipped 1 group(s)"));
    }

    #[test]
    fn test_two_cut_values_two_results() {
        let mut rows = Vec::new();
        for (i, v) in [10.0, 14.0, 11.0, 13.0].iter().enumerate() {
            rows.push(vec![CellValue::Int(i as i64 + 1), "A".into(), CellValue::Float(*v)]);
            rows.push(vec![CellValue::Int(i as i64 + 1), "B".into(), CellValue::Float(v * 2.0)]);
        }
        let table = Table::from_rows(vec!["w".into(), "site".into(), "v".into()], rows).unwrap();
        let request = raw_request().with_cut_columns(["site"]);
        let (results, status) = analyze(&table, &request);
        assert_eq!(results.len(), 2, "{}", status.outcome);
        assert_eq!(results[0].name, "site=A");
        assert_eq!(results[1].title, "Chart for v - site=B");
        assert_eq!(results[1].key, vec![("site".to_string(), "B".to_string())]);
    }

    #[test]
    fn test_analyze_idempotent() {
        let table = weekly_codes(&[3.0, 8.0, 0.0, 4.0, 9.0, 2.0, 30.0, 5.0]);
        let request = raw_request();
        let (a, sa) = analyze(&table, &request);
        let (b, sb) = analyze(&table, &request);
        assert_eq!(a, b);
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_zero_period_excluded_from_outliers() {
        let table = weekly_codes(&[10.0, 12.0, 0.0, 11.0, 13.0]);
        let (results, _) = analyze(&table, &raw_request());
        let p = &results[0].periods[2];
        assert!(p.flags.zero);
        assert!(!p.flags.low);
        assert_eq!(results[0].counts.zero, 1);
    }

    #[test]
    fn test_weekly_calendar_aggregation() {
        let rows = vec![
            vec!["2024-01-01".into(), 10.into()],
            vec!["2024-01-02".into(), 20.into()],
            vec!["2024-01-08".into(), 12.into()],
            vec!["2024-01-15".into(), 14.into()],
            vec!["2024-01-16".into(), 16.into()],
        ];
        let table = Table::from_rows(vec!["date".into(), "v".into()], rows).unwrap();
        let request = AnalysisRequest::new("v", ["date"]).with_rolling_window(2);
        let (results, status) = analyze(&table, &request);
        assert_eq!(results.len(), 1, "{}", status.outcome);
        let r = &results[0];
        assert_eq!(r.time_kind, TimeKind::Calendar);
        assert_eq!(r.aggregation, AggregationMode::Weekly);
        assert_eq!(r.data_points(), 3);
        assert!((r.periods[0].value - 15.0).abs() < 1e-12);
        assert_eq!(r.periods[0].rows, vec![RowId(0), RowId(1)]);
        assert!((r.stats.mean - 14.0).abs() < 1e-12);
        assert!((r.stats.min - 12.0).abs() < 1e-12);
        assert!((r.stats.max - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_dropped_rows_counted() {
        let rows = vec![
            vec![1.into(), 10.into()],
            vec![2.into(), "n/a".into()],
            vec![CellValue::Null, 11.into()],
            vec![3.into(), 12.into()],
            vec![4.into(), 15.into()],
        ];
        let table = Table::from_rows(vec!["w".into(), "v".into()], rows).unwrap();
        let (results, status) = analyze(&table, &raw_request());
        assert_eq!(results.len(), 1);
        assert_eq!(status.rows_dropped, 2);
        assert!(status.outcome.contains("2 rows excluded"));
    }

    #[test]
    fn test_filters_leave_nothing() {
        let table = weekly_codes(&[1.0, 2.0, 3.0]);
        let request = raw_request().with_filters(Filters::new().with("w", ["99"]));
        let (results, status) = analyze(&table, &request);
        assert!(results.is_empty());
        assert_eq!(status.outcome, "No data remaining after applying filters.");
        assert_eq!(
            status.error,
            Some(AnalysisError::InputEmpty {
                stage: STAGE_FILTER
            })
        );
    }

    #[test]
    fn test_cleaning_leaves_nothing() {
        let rows = vec![vec![1.into(), "x".into()], vec![2.into(), "y".into()]];
        let table = Table::from_rows(vec!["w".into(), "v".into()], rows).unwrap();
        let (results, status) = analyze(&table, &raw_request());
        assert!(results.is_empty());
        assert_eq!(status.outcome, "2 rows dropped; no data remains.");
    }

    #[test]
    fn test_missing_value_column() {
        let table = weekly_codes(&[1.0, 2.0]);
        let request = AnalysisRequest::new("nope", ["w"]);
        let err = analyze_detailed(&table, &request).unwrap_err();
        assert_eq!(err, AnalysisError::MissingColumn("nope".into()));
        let (_, status) = analyze(&table, &request);
        assert!(status.outcome.contains("nope"));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let table = weekly_codes(&[1.0, 2.0, 3.0]);
        let request = raw_request().with_rolling_window(0);
        assert!(matches!(
            analyze_detailed(&table, &request),
            Err(AnalysisError::InvalidParameter {
                name: "rolling_window",
                ..
            })
        ));
    }

    #[test]
    fn test_time_unification_failure() {
        let rows = vec![
            vec!["alpha".into(), 1.into()],
            vec!["beta".into(), 2.into()],
            vec!["2024-01-01".into(), 3.into()],
        ];
        let table = Table::from_rows(vec!["t".into(), "v".into()], rows).unwrap();
        let (results, status) = analyze(&table, &AnalysisRequest::new("v", ["t"]));
        assert!(results.is_empty());
        assert!(matches!(
            status.error,
            Some(AnalysisError::TimeUnification { .. })
        ));
    }

    #[test]
    fn test_undersized_group_reported() {
        let rows = vec![
            vec![1.into(), "A".into(), 10.into()],
            vec![2.into(), "A".into(), 14.into()],
            vec![3.into(), "A".into(), 11.into()],
            vec![1.into(), "B".into(), 10.into()],
        ];
        let table = Table::from_rows(vec!["w".into(), "site".into(), "v".into()], rows).unwrap();
        let analysis = analyze_detailed(&table, &raw_request().with_cut_columns(["site"])).unwrap();
        assert_eq!(analysis.groups.len(), 2);
        assert!(analysis.groups[0].result.is_ok());
        assert_eq!(
            analysis.groups[1].result,
            Err(SkipReason::InsufficientRows { rows: 1 })
        );
    }

    #[test]
    fn test_duplicate_keys_stay_separate_periods() {
        let rows = vec![
            vec![1.into(), 10.into()],
            vec![2.into(), 12.into()],
            vec![2.into(), 13.into()],
            vec![3.into(), 11.into()],
        ];
        let table = Table::from_rows(vec!["w".into(), "v".into()], rows).unwrap();
        let (results, status) = analyze(&table, &raw_request());
        assert_eq!(results.len(), 1, "{}", status.outcome);
        let r = &results[0];
        assert_eq!(r.data_points(), 4);
        assert_eq!(r.periods[1].time, r.periods[2].time);
        assert_eq!(r.periods[1].rows, vec![RowId(1)]);
        assert_eq!(r.periods[2].rows, vec![RowId(2)]);
        assert!(r.periods.windows(2).all(|w| w[0].time <= w[1].time));
    }
}
