//! Cell values of a loaded table.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A single typed cell as produced by the tabular loader.
///
/// The loader decides the variant; the engine only asks whether a cell is
/// empty, numeric, or what its display form is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    /// Missing value.
    #[default]
    Null,
    /// Integer value.
    Int(i64),
    /// Floating-point value. `NaN` is treated as missing.
    Float(f64),
    /// Free text.
    Text(String),
    /// A timestamp the loader already recognized.
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Returns true for `Null`, `NaN`, and blank text.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell.
    ///
    /// Integers and finite floats convert directly; text converts when it
    /// parses as a finite number after trimming. Timestamps are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Returns true if [`as_f64`](Self::as_f64) succeeds.
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Display form used for filtering, grouping, and key concatenation.
    ///
    /// Integral floats render without a fractional part so that `2023.0`
    /// and `2023` produce the same key.
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) if v.is_nan() => Ok(()),
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{v:.0}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(s) => f.write_str(s.trim()),
            CellValue::DateTime(dt) if dt.time() == NaiveTime::MIN => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int(i64::from(v))
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::DateTime(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_null_detection() {
        assert!(CellValue::Null.is_null());
        assert!(CellValue::Float(f64::NAN).is_null());
        assert!(CellValue::Text("   ".into()).is_null());
        assert!(!CellValue::Int(0).is_null());
        assert!(!CellValue::Text("0".into()).is_null());
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(CellValue::Int(7).as_f64(), Some(7.0));
        assert_eq!(CellValue::Text(" 3.5 ".into()).as_f64(), Some(3.5));
        assert_eq!(CellValue::Text("abc".into()).as_f64(), None);
        assert_eq!(CellValue::Float(f64::INFINITY).as_f64(), None);
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(CellValue::DateTime(dt).as_f64(), None);
    }

    #[test]
    fn test_display_integral_float() {
        assert_eq!(CellValue::Float(2023.0).display(), "2023");
        assert_eq!(CellValue::Float(1.5).display(), "1.5");
        assert_eq!(CellValue::Int(12).display(), "12");
        assert_eq!(CellValue::Null.display(), "");
    }

    #[test]
    fn test_display_datetime() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let midnight = d.and_hms_opt(0, 0, 0).unwrap();
        let later = d.and_hms_opt(13, 5, 0).unwrap();
        assert_eq!(CellValue::DateTime(midnight).display(), "2024-03-09");
        assert_eq!(CellValue::DateTime(later).display(), "2024-03-09 13:05:00");
    }

    #[test]
    fn test_from_option() {
        let v: CellValue = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: CellValue = Some(5_i64).into();
        assert_eq!(v, CellValue::Int(5));
    }
}
