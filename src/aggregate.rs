//! Aggregation of a group's observations into periods.
//!
//! Calendar modes bucket observations into days, weeks, months, or years and
//! take the arithmetic mean of each non-empty bucket. Empty buckets are
//! dropped, not zero-filled. Without aggregation, or when the time key has no
//! calendar meaning, every observation is its own period.
//!
//! Bucket labels follow the usual resampling convention: a day is labelled by
//! its midnight, a week by its closing Sunday, a month by its last day and a
//! year by December 31.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{ConfigError, SkipReason};
use crate::segment::Observation;
use crate::timeaxis::{TimeKey, TimeKind};

/// Time bucketing applied before control limits are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Every row is its own period.
    None,
    Daily,
    #[default]
    Weekly,
    Monthly,
    Yearly,
    /// A mode this crate does not build; only seen on results loaded from
    /// elsewhere.
    #[serde(other)]
    Unrecognized,
}

impl AggregationMode {
    /// Short code: `none`, `D`, `W`, `M`, `Y`.
    pub fn code(self) -> &'static str {
        match self {
            AggregationMode::None => "none",
            AggregationMode::Daily => "D",
            AggregationMode::Weekly => "W",
            AggregationMode::Monthly => "M",
            AggregationMode::Yearly => "Y",
            AggregationMode::Unrecognized => "?",
        }
    }

    /// Display label used in titles and summaries.
    pub fn label(self) -> &'static str {
        match self {
            AggregationMode::None => "Raw",
            AggregationMode::Daily => "Daily",
            AggregationMode::Weekly => "Weekly",
            AggregationMode::Monthly => "Monthly",
            AggregationMode::Yearly => "Yearly",
            AggregationMode::Unrecognized => "Unrecognized",
        }
    }

    /// Returns true for the calendar bucketing modes.
    pub fn is_calendar(self) -> bool {
        matches!(
            self,
            AggregationMode::Daily
                | AggregationMode::Weekly
                | AggregationMode::Monthly
                | AggregationMode::Yearly
        )
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AggregationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "raw" | "" => Ok(AggregationMode::None),
            "d" | "daily" => Ok(AggregationMode::Daily),
            "w" | "weekly" => Ok(AggregationMode::Weekly),
            "m" | "monthly" => Ok(AggregationMode::Monthly),
            "y" | "yearly" => Ok(AggregationMode::Yearly),
            _ => Err(ConfigError::UnknownAggregation(s.to_string())),
        }
    }
}

/// One aggregation bucket.
#[derive(Debug, Clone)]
pub struct Bucket<'a> {
    /// Bucket label (calendar modes) or the observation's own key.
    pub time: TimeKey,
    /// Mean of the members' values.
    pub value: f64,
    /// Members in time order.
    pub members: Vec<Observation<'a>>,
}

/// Aggregates one group's observations.
///
/// Per-row mode applies when `mode` is [`AggregationMode::None`] or the keys
/// are ordinal. Observations are stably sorted by key first.
///
/// # Errors
///
/// - [`SkipReason::InsufficientPeriods`] if fewer than two buckets result.
/// - [`SkipReason::Computation`] for [`AggregationMode::Unrecognized`] or a
///   bucket label outside the calendar range.
pub fn aggregate<'a>(
    mut observations: Vec<Observation<'a>>,
    mode: AggregationMode,
) -> Result<Vec<Bucket<'a>>, SkipReason> {
    observations.sort_by(|a, b| a.key.cmp(&b.key));

    let ordinal = observations
        .first()
        .is_some_and(|o| o.key.kind() == TimeKind::Ordinal);

    let buckets = if mode == AggregationMode::None || ordinal {
        observations
            .into_iter()
            .map(|o| Bucket {
                time: o.key,
                value: o.value,
                members: vec![o],
            })
            .collect()
    } else if mode == AggregationMode::Unrecognized {
        return Err(SkipReason::Computation(
            "unrecognized aggregation mode".to_string(),
        ));
    } else {
        calendar_buckets(observations, mode)?
    };

    if buckets.len() < 2 {
        return Err(SkipReason::InsufficientPeriods {
            periods: buckets.len(),
        });
    }
    Ok(buckets)
}

fn calendar_buckets<'a>(
    observations: Vec<Observation<'a>>,
    mode: AggregationMode,
) -> Result<Vec<Bucket<'a>>, SkipReason> {
    let mut grouped: BTreeMap<NaiveDate, Vec<Observation<'a>>> = BTreeMap::new();
    for obs in observations {
        let Some(dt) = obs.key.as_calendar() else {
            return Err(SkipReason::Computation(format!(
                "ordinal key {} in calendar aggregation",
                obs.key
            )));
        };
        let label = bucket_label(dt, mode).ok_or_else(|| {
            SkipReason::Computation(format!("no {} bucket for {dt}", mode.label()))
        })?;
        grouped.entry(label).or_default().push(obs);
    }

    Ok(grouped
        .into_iter()
        .map(|(label, members)| Bucket {
            time: TimeKey::Calendar(label.and_time(NaiveTime::MIN)),
            value: members.iter().map(|o| o.value).mean(),
            members,
        })
        .collect())
}

/// Label date of the bucket containing `dt`.
pub(crate) fn bucket_label(dt: NaiveDateTime, mode: AggregationMode) -> Option<NaiveDate> {
    let date = dt.date();
    match mode {
        AggregationMode::Daily => Some(date),
        AggregationMode::Weekly => {
            let to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
            date.checked_add_days(Days::new(to_sunday))
        }
        AggregationMode::Monthly => {
            let (y, m) = if date.month() == 12 {
                (date.year() + 1, 1)
            } else {
                (date.year(), date.month() + 1)
            };
            NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt()
        }
        AggregationMode::Yearly => NaiveDate::from_ymd_opt(date.year(), 12, 31),
        AggregationMode::None | AggregationMode::Unrecognized => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Table};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn table(n: usize) -> Table {
        Table::from_rows(vec!["x".into()], (0..n).map(|_| vec![CellValue::Null]).collect())
            .unwrap()
    }

    fn calendar_obs<'a>(t: &'a Table, data: &[(NaiveDateTime, f64)]) -> Vec<Observation<'a>> {
        t.rows()
            .iter()
            .zip(data)
            .map(|(row, &(dt, value))| Observation {
                row,
                key: TimeKey::Calendar(dt),
                value,
            })
            .collect()
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("W".parse::<AggregationMode>().unwrap(), AggregationMode::Weekly);
        assert_eq!("monthly".parse::<AggregationMode>().unwrap(), AggregationMode::Monthly);
        assert_eq!("none".parse::<AggregationMode>().unwrap(), AggregationMode::None);
        assert!("Q".parse::<AggregationMode>().is_err());
    }

    #[test]
    fn test_mode_serde_unrecognized() {
        let m: AggregationMode = serde_json::from_str("\"quarterly\"").unwrap();
        assert_eq!(m, AggregationMode::Unrecognized);
        let m: AggregationMode = serde_json::from_str("\"daily\"").unwrap();
        assert_eq!(m, AggregationMode::Daily);
    }

    #[test]
    fn test_weekly_label_is_sunday() {
        // 2024-01-03 is a Wednesday
        let label = bucket_label(at(2024, 1, 3), AggregationMode::Weekly).unwrap();
        assert_eq!(label, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        // Sunday maps to itself
        let label = bucket_label(at(2024, 1, 7), AggregationMode::Weekly).unwrap();
        assert_eq!(label, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
    }

    #[test]
    fn test_month_and_year_labels() {
        assert_eq!(
            bucket_label(at(2024, 2, 10), AggregationMode::Monthly),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            bucket_label(at(2023, 12, 5), AggregationMode::Monthly),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
        assert_eq!(
            bucket_label(at(2023, 6, 5), AggregationMode::Yearly),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
    }

    #[test]
    fn test_weekly_mean_and_gap_dropped() {
        let t = table(4);
        let obs = calendar_obs(
            &t,
            &[
                (at(2024, 1, 1), 10.0),
                (at(2024, 1, 2), 20.0),
                // week of 2024-01-08 is empty
                (at(2024, 1, 16), 5.0),
                (at(2024, 1, 17), 7.0),
            ],
        );
        let buckets = aggregate(obs, AggregationMode::Weekly).unwrap();
        assert_eq!(buckets.len(), 2);
        assert!((buckets[0].value - 15.0).abs() < 1e-12);
        assert!((buckets[1].value - 6.0).abs() < 1e-12);
        assert_eq!(buckets[0].members.len(), 2);
        assert!(buckets[0].time < buckets[1].time);
    }

    #[test]
    fn test_none_mode_sorts_rows() {
        let t = table(3);
        let obs = calendar_obs(
            &t,
            &[(at(2024, 1, 3), 3.0), (at(2024, 1, 1), 1.0), (at(2024, 1, 2), 2.0)],
        );
        let buckets = aggregate(obs, AggregationMode::None).unwrap();
        let values: Vec<f64> = buckets.iter().map(|b| b.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_none_mode_keeps_duplicate_keys() {
        let t = table(4);
        let obs = calendar_obs(
            &t,
            &[
                (at(2024, 1, 2), 5.0),
                (at(2024, 1, 1), 1.0),
                (at(2024, 1, 2), 3.0),
                (at(2024, 1, 2), 4.0),
            ],
        );
        let buckets = aggregate(obs, AggregationMode::None).unwrap();
        assert_eq!(buckets.len(), 4);
        // equal keys stay separate periods in source order
        let values: Vec<f64> = buckets.iter().map(|b| b.value).collect();
        assert_eq!(values, vec![1.0, 5.0, 3.0, 4.0]);
        assert_eq!(buckets[1].time, buckets[2].time);
        assert!(buckets.windows(2).all(|w| w[0].time <= w[1].time));
        let ids: Vec<usize> = buckets.iter().map(|b| b.members[0].row.id().0).collect();
        assert_eq!(ids, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_ordinal_keys_bypass_calendar_mode() {
        let t = table(3);
        let obs: Vec<Observation> = t
            .rows()
            .iter()
            .zip([3.0, 1.0, 2.0])
            .map(|(row, k)| Observation {
                row,
                key: TimeKey::Ordinal(k),
                value: k * 10.0,
            })
            .collect();
        let buckets = aggregate(obs, AggregationMode::Monthly).unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].time, TimeKey::Ordinal(1.0));
        assert!((buckets[2].value - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_bucket_rejected() {
        let t = table(2);
        let obs = calendar_obs(&t, &[(at(2024, 1, 1), 1.0), (at(2024, 1, 2), 2.0)]);
        let err = aggregate(obs, AggregationMode::Monthly).unwrap_err();
        assert_eq!(err, SkipReason::InsufficientPeriods { periods: 1 });
    }

    #[test]
    fn test_unrecognized_mode_rejected() {
        let t = table(2);
        let obs = calendar_obs(&t, &[(at(2024, 1, 1), 1.0), (at(2024, 2, 2), 2.0)]);
        assert!(matches!(
            aggregate(obs, AggregationMode::Unrecognized),
            Err(SkipReason::Computation(_))
        ));
    }
}
