//! Unified time axis.
//!
//! Source tables encode time in many ways: a timestamp column, a text date,
//! a sequential week number, or several columns such as `Year` and `Month`.
//! The unifier decides once, per request, how to turn those fields into a
//! single [`TimeKey`] and carries that decision through every later stage.
//!
//! - [`TimeKey::Calendar`] — real calendar time; supports calendar bucketing
//!   and date-window traceability.
//! - [`TimeKey::Ordinal`] — a purely numeric ordering key with no calendar
//!   meaning; every row is its own period and traceability is exact-match.

mod parse;
mod unify;

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use parse::{parse_calendar, parse_calendar_str};
pub use unify::{TimeAxis, TimedRow, Unifier, UnifyStrategy, DEFAULT_SUCCESS_THRESHOLD};

/// Which kind of key a time axis carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeKind {
    Calendar,
    Ordinal,
}

/// A totally ordered time value.
///
/// Within one request all keys share the same variant. Across variants,
/// calendar keys sort before ordinal keys so that the order stays total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TimeKey {
    Calendar(NaiveDateTime),
    Ordinal(f64),
}

impl TimeKey {
    /// The key's kind.
    pub fn kind(&self) -> TimeKind {
        match self {
            TimeKey::Calendar(_) => TimeKind::Calendar,
            TimeKey::Ordinal(_) => TimeKind::Ordinal,
        }
    }

    /// Calendar value, if this is a calendar key.
    pub fn as_calendar(&self) -> Option<NaiveDateTime> {
        match self {
            TimeKey::Calendar(dt) => Some(*dt),
            TimeKey::Ordinal(_) => None,
        }
    }

    /// Ordinal value, if this is an ordinal key.
    pub fn as_ordinal(&self) -> Option<f64> {
        match self {
            TimeKey::Ordinal(v) => Some(*v),
            TimeKey::Calendar(_) => None,
        }
    }
}

impl PartialEq for TimeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TimeKey::Calendar(a), TimeKey::Calendar(b)) => a.cmp(b),
            (TimeKey::Ordinal(a), TimeKey::Ordinal(b)) => a.total_cmp(b),
            (TimeKey::Calendar(_), TimeKey::Ordinal(_)) => Ordering::Less,
            (TimeKey::Ordinal(_), TimeKey::Calendar(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Calendar(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            TimeKey::Ordinal(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{v:.0}"),
            TimeKey::Ordinal(v) => write!(f, "{v}"),
        }
    }
}
