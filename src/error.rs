//! Error types.
//!
//! One enum per concern, `thiserror` only. Request-level failures are
//! [`AnalysisError`]; a single group that cannot be charted is described by
//! [`SkipReason`] and never aborts its siblings.

/// Failures that abort a whole analysis request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// No rows are left at the given stage (after filtering or cleaning).
    #[error("no rows remain after {stage}")]
    InputEmpty { stage: &'static str },

    /// A requested column does not exist in the table.
    #[error("column '{0}' not found")]
    MissingColumn(String),

    /// A numeric or structural parameter is out of range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The time columns could not be unified into one orderable key.
    #[error(
        "cannot build a time axis from [{}]: {:.1}% of rows parsed, {:.1}% required",
        columns.join(", "),
        success_rate * 100.0,
        threshold * 100.0
    )]
    TimeUnification {
        columns: Vec<String>,
        success_rate: f64,
        threshold: f64,
    },
}

/// Why one group produced no chart.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum SkipReason {
    /// The group has fewer than two rows.
    #[error("insufficient data: {rows} row(s)")]
    InsufficientRows { rows: usize },

    /// Aggregation produced fewer than two periods.
    #[error("insufficient data: {periods} period(s) after aggregation")]
    InsufficientPeriods { periods: usize },

    /// The variation estimate is undefined or zero.
    #[error("degenerate variation estimate ({sigma})")]
    DegenerateVariation { sigma: f64 },

    /// Any other numeric failure while building the group's periods.
    #[error("computation failed: {0}")]
    Computation(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value '{field}': {message}")]
    Invalid { field: &'static str, message: String },

    #[error("unknown aggregation mode '{0}'")]
    UnknownAggregation(String),
}

/// Table construction errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
}

/// Session store errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("session '{0}' has no loaded table")]
    NoTable(String),

    #[error("session '{0}' has no results")]
    NoResults(String),
}

impl From<ConfigError> for AnalysisError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid { field, message } => AnalysisError::InvalidParameter {
                name: field,
                reason: message,
            },
            other => AnalysisError::InvalidParameter {
                name: "config",
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_unification_message() {
        let err = AnalysisError::TimeUnification {
            columns: vec!["Year".into(), "Month".into()],
            success_rate: 0.42,
            threshold: 0.7,
        };
        let msg = err.to_string();
        assert!(msg.contains("Year, Month"), "{msg}");
        assert!(msg.contains("42.0%"), "{msg}");
        assert!(msg.contains("70.0%"), "{msg}");
    }

    #[test]
    fn test_skip_reason_display() {
        let r = SkipReason::DegenerateVariation { sigma: 0.0 };
        assert!(r.to_string().contains("degenerate"));
        let r = SkipReason::InsufficientPeriods { periods: 1 };
        assert!(r.to_string().contains("1 period"));
    }

    #[test]
    fn test_config_invalid_maps_to_invalid_parameter() {
        let err: AnalysisError = ConfigError::Invalid {
            field: "rolling_window",
            message: "must be >= 1".into(),
        }
        .into();
        assert_eq!(
            err,
            AnalysisError::InvalidParameter {
                name: "rolling_window",
                reason: "must be >= 1".into()
            }
        );
    }
}
