//! Analysis configuration.
//!
//! Resolution order (highest priority first):
//! 1. Explicit overrides applied by the caller
//! 2. Environment variables (`SPC_TRACE_*`, via [`AnalysisConfig::apply_env_overrides`])
//! 3. A TOML file or string
//! 4. Compiled defaults

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationMode;
use crate::error::ConfigError;
use crate::spc::{DEFAULT_RECENT_FRACTION, DEFAULT_SEVERE_FACTOR};
use crate::timeaxis::DEFAULT_SUCCESS_THRESHOLD;

/// Prefix of the environment variables read by [`AnalysisConfig::apply_env_overrides`].
pub const ENV_PREFIX: &str = "SPC_TRACE_";

/// Tunable parameters of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Time bucketing. Default: weekly.
    pub aggregation: AggregationMode,
    /// Rolling window for the center line, in periods. Default: 7.
    pub rolling_window: usize,
    /// Control-limit multiplier k. Default: 2.0.
    pub limit_multiplier: f64,
    /// Fraction of rows that must yield a time key. Default: 0.70.
    pub success_threshold: f64,
    /// Severe outlier factor. Default: 5.0.
    pub severe_factor: f64,
    /// Start of the recent part of a sequence. Default: 0.5.
    pub recent_fraction: f64,
    /// Separator used when joining several time columns. Default: `" "`.
    pub time_separator: String,
    /// Half-width in days of the traceability fallback window. Default: 7.
    pub fallback_window_days: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationMode::Weekly,
            rolling_window: 7,
            limit_multiplier: 2.0,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            severe_factor: DEFAULT_SEVERE_FACTOR,
            recent_fraction: DEFAULT_RECENT_FRACTION,
            time_separator: " ".to_string(),
            fallback_window_days: 7,
        }
    }
}

impl AnalysisConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Applies `SPC_TRACE_*` environment variables on top of `self`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Applies overrides looked up by upper-case key (`AGGREGATION`,
    /// `ROLLING_WINDOW`, ...). Keys the lookup does not know are left alone.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AGGREGATION") {
            self.aggregation = v.parse()?;
        }
        if let Some(v) = lookup("ROLLING_WINDOW") {
            self.rolling_window = parse_field("rolling_window", &v)?;
        }
        if let Some(v) = lookup("LIMIT_MULTIPLIER") {
            self.limit_multiplier = parse_field("limit_multiplier", &v)?;
        }
        if let Some(v) = lookup("SUCCESS_THRESHOLD") {
            self.success_threshold = parse_field("success_threshold", &v)?;
        }
        if let Some(v) = lookup("SEVERE_FACTOR") {
            self.severe_factor = parse_field("severe_factor", &v)?;
        }
        if let Some(v) = lookup("RECENT_FRACTION") {
            self.recent_fraction = parse_field("recent_fraction", &v)?;
        }
        if let Some(v) = lookup("TIME_SEPARATOR") {
            self.time_separator = v;
        }
        if let Some(v) = lookup("FALLBACK_WINDOW_DAYS") {
            self.fallback_window_days = parse_field("fallback_window_days", &v)?;
        }
        self.validate()
    }

    /// Validates every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rolling_window == 0 {
            return Err(invalid("rolling_window", "must be >= 1"));
        }
        if !(self.limit_multiplier.is_finite() && self.limit_multiplier > 0.0) {
            return Err(invalid("limit_multiplier", "must be a positive number"));
        }
        if !(self.success_threshold > 0.0 && self.success_threshold <= 1.0) {
            return Err(invalid("success_threshold", "must be in (0, 1]"));
        }
        if !(self.severe_factor.is_finite() && self.severe_factor >= 1.0) {
            return Err(invalid("severe_factor", "must be >= 1"));
        }
        if !(self.recent_fraction > 0.0 && self.recent_fraction < 1.0) {
            return Err(invalid("recent_fraction", "must be in (0, 1)"));
        }
        if self.aggregation == AggregationMode::Unrecognized {
            return Err(invalid("aggregation", "unrecognized aggregation mode"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(field, &format!("cannot parse '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = AnalysisConfig::default();
        assert_eq!(c.aggregation, AggregationMode::Weekly);
        assert_eq!(c.rolling_window, 7);
        assert!((c.limit_multiplier - 2.0).abs() < f64::EPSILON);
        assert!((c.success_threshold - 0.70).abs() < f64::EPSILON);
        assert!((c.severe_factor - 5.0).abs() < f64::EPSILON);
        assert_eq!(c.fallback_window_days, 7);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let c = AnalysisConfig::from_toml_str(
            r#"
            aggregation = "monthly"
            rolling_window = 3
            "#,
        )
        .unwrap();
        assert_eq!(c.aggregation, AggregationMode::Monthly);
        assert_eq!(c.rolling_window, 3);
        assert!((c.limit_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_toml_invalid_value() {
        let err = AnalysisConfig::from_toml_str("rolling_window = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "rolling_window", .. }));

        let err = AnalysisConfig::from_toml_str("success_threshold = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "success_threshold", .. }));
    }

    #[test]
    fn test_from_toml_unknown_mode_rejected() {
        let err = AnalysisConfig::from_toml_str(r#"aggregation = "quarterly""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "aggregation", .. }));
    }

    #[test]
    fn test_from_toml_syntax_error() {
        let err = AnalysisConfig::from_toml_str("rolling_window = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "limit_multiplier = 3.0\nrecent_fraction = 0.25").unwrap();
        let c = AnalysisConfig::from_toml_file(file.path()).unwrap();
        assert!((c.limit_multiplier - 3.0).abs() < f64::EPSILON);
        assert!((c.recent_fraction - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_toml_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = AnalysisConfig::from_toml_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [("AGGREGATION", "D"), ("ROLLING_WINDOW", "4")]
            .into_iter()
            .collect();
        let mut c = AnalysisConfig::default();
        c.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.aggregation, AggregationMode::Daily);
        assert_eq!(c.rolling_window, 4);
    }

    #[test]
    fn test_overrides_bad_value() {
        let mut c = AnalysisConfig::default();
        let err = c
            .apply_overrides_from(|k| (k == "LIMIT_MULTIPLIER").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "limit_multiplier", .. }));

        let err = c
            .apply_overrides_from(|k| (k == "AGGREGATION").then(|| "Q".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAggregation(_)));
    }
}
