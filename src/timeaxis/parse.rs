//! Calendar parsing of cell values.
//!
//! Only text and timestamp cells are calendar candidates. Numeric cells are
//! never interpreted as epoch offsets; purely numeric time columns become
//! ordinal keys instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::table::CellValue;

/// Formats carrying a time of day.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Formats carrying a full date.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y %m %d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
];

/// Formats naming a month only; the first day of the month is assumed.
const MONTH_FORMATS: &[(&str, &str)] = &[
    ("%Y-%m-%d", "-01"),
    ("%Y/%m/%d", "/01"),
    ("%d %b %Y", ""),
];

/// Parses a cell as calendar time.
///
/// Timestamp cells pass through; text cells are tried against the known
/// formats; every other cell yields `None`.
pub fn parse_calendar(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Text(s) => parse_calendar_str(s),
        _ => None,
    }
}

/// Parses text as calendar time.
///
/// Accepts RFC 3339 timestamps (converted to UTC wall time), common
/// date-time and date layouts, and `YYYY-MM` / `Mon YYYY` month stamps.
///
/// # Examples
///
/// ```
/// use u_spc_trace::timeaxis::parse_calendar_str;
///
/// assert!(parse_calendar_str("2024-02-29").is_some());
/// assert!(parse_calendar_str("2024-03").is_some());
/// assert!(parse_calendar_str("42").is_none());
/// ```
pub fn parse_calendar_str(text: &str) -> Option<NaiveDateTime> {
    let s = text.trim();
    if s.is_empty() || s.parse::<f64>().is_ok() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    for (fmt, suffix) in MONTH_FORMATS {
        let candidate = if suffix.is_empty() {
            format!("01 {s}")
        } else {
            format!("{s}{suffix}")
        };
        if let Ok(d) = NaiveDate::parse_from_str(&candidate, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}
