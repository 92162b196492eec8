//! Export-ready summary of a session's charts.
//!
//! Charts are ordered by recent outlier count, highest first, so the most
//! actionable findings lead. Rendering is left to the caller; this module
//! only assembles the numbers.

use serde::{Deserialize, Serialize};

use crate::engine::{DescriptiveStats, GroupResult};

/// One chart's line in the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    /// 1-based position in priority order.
    pub rank: usize,
    pub title: String,
    pub group: String,
    pub data_points: usize,
    pub outliers: usize,
    pub recent_outliers: usize,
    pub severe_outliers: usize,
    pub zero_values: usize,
    /// Share of periods with a zero value, in percent.
    pub zero_pct: f64,
    pub stats: DescriptiveStats,
    /// Set when the chart has at least one recent outlier.
    pub high_priority: bool,
}

/// Headline figures and per-chart lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub total_charts: usize,
    pub charts_with_recent_anomalies: usize,
    pub total_anomalies: usize,
    pub recent_anomalies: usize,
    /// Charts in priority order.
    pub charts: Vec<ChartSummary>,
}

impl ExportSummary {
    /// Builds the summary; ties keep their input order.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_spc_trace::report::ExportSummary;
    ///
    /// let summary = ExportSummary::from_results(&[]);
    /// assert_eq!(summary.total_charts, 0);
    /// assert!(summary.charts.is_empty());
    /// ```
    pub fn from_results(results: &[GroupResult]) -> Self {
        let mut ordered: Vec<&GroupResult> = results.iter().collect();
        ordered.sort_by(|a, b| b.counts.recent.cmp(&a.counts.recent));

        let charts: Vec<ChartSummary> = ordered
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let data_points = r.data_points();
                let zero_pct = if data_points > 0 {
                    r.counts.zero as f64 / data_points as f64 * 100.0
                } else {
                    0.0
                };
                ChartSummary {
                    rank: i + 1,
                    title: r.title.clone(),
                    group: r.name.clone(),
                    data_points,
                    outliers: r.counts.outliers(),
                    recent_outliers: r.counts.recent,
                    severe_outliers: r.counts.severe_high + r.counts.severe_low,
                    zero_values: r.counts.zero,
                    zero_pct,
                    stats: r.stats,
                    high_priority: r.counts.recent > 0,
                }
            })
            .collect();

        Self {
            total_charts: charts.len(),
            charts_with_recent_anomalies: charts.iter().filter(|c| c.high_priority).count(),
            total_anomalies: charts.iter().map(|c| c.outliers).sum(),
            recent_anomalies: charts.iter().map(|c| c.recent_outliers).sum(),
            charts,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
